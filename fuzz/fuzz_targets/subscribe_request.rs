#![no_main]

use catcher_core::stream::SubscribeRequest;
use catcher_core::types::IpNetwork;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<SubscribeRequest>(data) else {
        return;
    };
    let _ = request.kinds();
    for net in &request.nets {
        let _ = net.parse::<IpNetwork>();
    }
});
