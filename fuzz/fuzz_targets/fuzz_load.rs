#![no_main]

use lib3mf_engine::{Document, ParserConfig, Strictness};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Whole pipeline: ZIP, content types, relationships, model parsing, validation
    let _ = Document::load(Cursor::new(data));

    // Lenient loads keep what they can; validating and saving the result must not panic
    if let Ok(document) = Document::load_with_config(Cursor::new(data), ParserConfig::lenient()) {
        let _ = document.validate(Strictness::Strict);
        let _ = document.save(Cursor::new(Vec::new()));
    }
});
