#![no_main]
use gatekeep::iam::{Action, Args, Policy};
use libfuzzer_sys::fuzz_target;

// Arbitrary documents must either fail to parse or round-trip to an equal policy
fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(policy) = Policy::from_json(json) else {
        return;
    };

    let encoded = match policy.to_json() {
        Ok(e) => e,
        Err(_) => return,
    };
    let reparsed = Policy::from_json(&encoded).expect("serialized policy must parse");
    assert!(reparsed.equals(&policy));

    if let Ok(action) = Action::parse("s3:GetObject") {
        let args = Args::new(action, "bucket", "object");
        assert_eq!(policy.is_allowed(&args), reparsed.is_allowed(&args));
    }
});
