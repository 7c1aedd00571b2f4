#![no_main]

use ishy_client::protocol::{AggregateStats, CommandResponse, UserStatus};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Every response body the client reads goes through one of these.
    let _ = serde_json::from_slice::<CommandResponse>(data);
    let _ = serde_json::from_slice::<AggregateStats>(data);

    if let Ok(status) = serde_json::from_slice::<UserStatus>(data) {
        let _ = status.presence().label();
    }
});
