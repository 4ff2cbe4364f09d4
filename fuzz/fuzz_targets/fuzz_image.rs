//! Fuzz testing for the table reader.
//!
//! Feeds arbitrary bytes to the image parser and lookup path in both
//! bucket layouts. Hostile images may come back as `Corrupt`, but they
//! must never panic, loop, or read out of bounds.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use coldmap::table::TableView;
use coldmap::BucketLayout;

#[derive(Debug, Arbitrary)]
struct ImageInput {
    image: Vec<u8>,
    keys: Vec<Vec<u8>>,
    split: bool,
}

fuzz_target!(|input: ImageInput| {
    let layout = if input.split {
        BucketLayout::Split
    } else {
        BucketLayout::Combined
    };

    let Ok((view, _dirty)) = TableView::parse(&input.image, layout) else {
        return;
    };

    for key in &input.keys {
        let _ = view.lookup(key);
    }

    let _ = view.occupied();
    for idx in 0..view.bucket_count() {
        let _ = view.entry(idx);
    }
});
