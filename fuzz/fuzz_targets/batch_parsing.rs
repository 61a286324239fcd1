#![no_main]

//! Fuzz target for event stream parsing.
//!
//! Feeds arbitrary bytes to the batch parsers to make sure malformed stream
//! lines are rejected with an error and never cause a panic.

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use tether_broker::{parse_batch, parse_batches, EventBatch};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(batch) = parse_batch::<Value>(input) {
        check_batch(&batch);
    }

    if let Ok(batches) = parse_batches::<Value>(input) {
        assert!(batches.len() <= input.lines().count());
        batches.iter().for_each(check_batch);
    }
});

fn check_batch(batch: &EventBatch<Value>) {
    assert_eq!(batch.is_keep_alive(), batch.events.is_empty());
}
