#![no_main]

//! Fuzz target for broker rejection bodies.
//!
//! Parses arbitrary bytes as a list of publishing problems and checks that
//! the failed-event count never exceeds the number of problems reported.

use libfuzzer_sys::fuzz_target;
use tether_broker::{EventType, FlowId, PublishingError, PublishingProblem};

fuzz_target!(|data: &[u8]| {
    let Ok(problems) = serde_json::from_slice::<Vec<PublishingProblem>>(data) else {
        return;
    };

    let total = problems.len();
    let error = PublishingError::new(EventType::new("fuzz"), FlowId::from("fuzz-flow"), problems);

    assert!(error.failed_count() <= total);
    assert!(error.to_string().contains("fuzz-flow"));
});
