#![allow(dead_code)]

use proptest::collection::vec;
use proptest::prelude::*;

/// Strategy for generating opaque message payloads
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..512)
}

/// Strategy for generating a short run of message payloads
pub fn payloads_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    vec(payload_strategy(), 0..8)
}

/// Strategy for generating lowercase metadata keys (header tokens)
pub fn metadata_key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,24}".prop_filter("grpc- prefix is reserved", |key| {
        !key.starts_with("grpc-") && !key.ends_with("-bin")
    })
}

/// Strategy for generating ASCII metadata values without surrounding whitespace
pub fn metadata_value_strategy() -> impl Strategy<Value = String> {
    "[!-~]([ -~]{0,30}[!-~])?"
}

/// Strategy for generating trailer pairs (keys may repeat)
pub fn trailer_pairs_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    vec((metadata_key_strategy(), metadata_value_strategy()), 0..10)
}

/// Strategy for generating the same key in random letter case
pub fn mixed_case_strategy(key: String) -> impl Strategy<Value = String> {
    vec(any::<bool>(), key.len()).prop_map(move |flips| {
        key.chars()
            .zip(flips)
            .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

/// Strategy for generating chunk sizes used to split a body
pub fn chunk_sizes_strategy() -> impl Strategy<Value = Vec<usize>> {
    vec(1usize..64, 1..16)
}

/// Strategy for generating status messages, including control and non-BMP characters
pub fn status_message_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("\t\ntest with whitespace\r\nand Unicode BMP \u{263A} and non-BMP \u{1F608}\t\n".to_string()),
        Just("100% done".to_string()),
        any::<String>(),
    ]
}

/// Split `body` into consecutive chunks, cycling through `sizes`
pub fn split_by(body: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    let mut index = 0;
    while offset < body.len() {
        let size = sizes[index % sizes.len()].max(1);
        let end = (offset + size).min(body.len());
        chunks.push(body[offset..end].to_vec());
        offset = end;
        index += 1;
    }
    chunks
}
