#![no_main]

use libfuzzer_sys::fuzz_target;

use propbridge_core::multivalue::{parse_input_line, parse_paste_text};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for token in parse_input_line(text, ";") {
        assert!(!token.is_empty());
        assert_eq!(token, token.trim());
    }
    let _ = parse_paste_text(text, ",");
});
