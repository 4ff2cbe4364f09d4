//! # coldmap CLI Entry Point
//!
//! Inspection and build tooling for map files.
//!
//! ## Usage
//!
//! ```bash
//! # Header and occupancy of an existing map
//! coldmap stats words.leda
//!
//! # Look one key up (raw value bytes to stdout)
//! coldmap get words.leda tur
//!
//! # Dump all entries as key<TAB>value lines
//! coldmap dump words.leda
//!
//! # Build from TAB-separated lines (stdin when no input file given)
//! coldmap build words.leda input.tsv
//!
//! # Legacy files with two pointers per bucket
//! coldmap get --layout split old.leda tur
//! ```

use std::env;
use std::io::{Read, Write};

use eyre::{bail, Result, WrapErr};

use coldmap::{BucketLayout, ColdMap, ColdMapBuilder};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut layout = BucketLayout::Combined;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("coldmap {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--layout" => {
                i += 1;
                layout = match args.get(i).map(String::as_str) {
                    Some("combined") => BucketLayout::Combined,
                    Some("split") => BucketLayout::Split,
                    Some(other) => bail!("unknown layout '{}'", other),
                    None => bail!("--layout needs a value (combined or split)"),
                };
            }
            arg if arg.starts_with('-') => {
                bail!("Unknown option: {}", arg);
            }
            arg => positional.push(arg),
        }
        i += 1;
    }

    match positional.as_slice() {
        &["stats", path] => stats(path, layout),
        &["get", path, key] => get(path, key, layout),
        &["dump", path] => dump(path, layout),
        &["build", out] => build(out, None, layout),
        &["build", out, input] => build(out, Some(input), layout),
        &[] => {
            print_usage();
            Ok(())
        }
        &[cmd, ..] => bail!("unknown or incomplete command '{}'", cmd),
    }
}

fn open(path: &str, layout: BucketLayout) -> Result<ColdMap> {
    ColdMap::open_with_layout(path, layout)
        .wrap_err_with(|| format!("cannot open map '{}'", path))
}

fn stats(path: &str, layout: BucketLayout) -> Result<()> {
    let map = open(path, layout)?;
    let occupied = map.len().wrap_err("cannot scan bucket table")?;

    println!("file:          {}", map.path().display());
    println!("size:          {} bytes", map.file_len());
    println!("layout:        {:?}", map.layout());
    println!("buckets:       {}", map.bucket_count());
    println!("occupied:      {}", occupied);
    println!(
        "load factor:   {:.1}%",
        occupied as f64 * 100.0 / map.bucket_count() as f64
    );
    println!("dirty at open: {}", map.dirty_at_open());
    println!("dirty now:     {}", map.is_dirty());
    Ok(())
}

fn get(path: &str, key: &str, layout: BucketLayout) -> Result<()> {
    let map = open(path, layout)?;
    match map.get(key.as_bytes())? {
        Some(value) => {
            std::io::stdout()
                .write_all(value)
                .wrap_err("cannot write value")?;
            println!();
            Ok(())
        }
        None => bail!("key '{}' not found", key),
    }
}

fn dump(path: &str, layout: BucketLayout) -> Result<()> {
    let map = open(path, layout)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for entry in map.iter()? {
        let (key, value) = entry.wrap_err("corrupt entry while dumping")?;
        writeln!(
            out,
            "{}\t{}",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        )
        .wrap_err("cannot write entry")?;
    }
    Ok(())
}

fn build(out: &str, input: Option<&str>, layout: BucketLayout) -> Result<()> {
    let text = match input {
        Some(path) => {
            std::fs::read_to_string(path).wrap_err_with(|| format!("cannot read '{}'", path))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .lock()
                .read_to_string(&mut buf)
                .wrap_err("cannot read stdin")?;
            buf
        }
    };

    let mut builder = ColdMapBuilder::with_layout(layout);
    for (lineno, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('\t') else {
            bail!("line {}: expected key<TAB>value", lineno + 1);
        };
        builder.insert(key, value);
    }

    let stats = builder
        .publish(out)
        .wrap_err_with(|| format!("cannot publish map to '{}'", out))?;
    println!(
        "wrote {} entries into {} buckets ({} collisions)",
        stats.entry_count, stats.bucket_count, stats.collisions
    );
    Ok(())
}

fn print_usage() {
    println!("coldmap - read-only memory-mapped hash maps");
    println!();
    println!("USAGE:");
    println!("    coldmap [--layout combined|split] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    stats <file>             Show header and occupancy");
    println!("    get <file> <key>         Print the value stored for <key>");
    println!("    dump <file>              Print all entries as key<TAB>value");
    println!("    build <file> [<in.tsv>]  Build and atomically publish a map");
    println!();
    println!("OPTIONS:");
    println!("    --layout <combined|split>  Bucket layout (default: combined)");
    println!("    -h, --help                 Show this help");
    println!("    -v, --version              Show version");
}
