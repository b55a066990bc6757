#![no_main]
use arbitrary::Arbitrary;
use gatekeep::iam::{is_allowed_par_with, is_allowed_serial, merge_policies, Action, Args, Policy};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    documents: Vec<String>,
    action: String,
    bucket: String,
    object: String,
    owner: bool,
    chunk: u8,
    workers: u8,
}

// Every evaluation path must reach the same decision
fuzz_target!(|input: Input| {
    let policies: Vec<Policy> = input
        .documents
        .iter()
        .filter_map(|doc| Policy::from_json(doc).ok())
        .collect();
    let Ok(action) = Action::parse(&input.action) else {
        return;
    };
    let args = Args::new(action, input.bucket, input.object).with_owner(input.owner);

    let serial = is_allowed_serial(&policies, &args);
    let parallel = is_allowed_par_with(
        &policies,
        &args,
        usize::from(input.chunk.max(1)),
        usize::from(input.workers % 8 + 1),
    );
    assert_eq!(serial, parallel);

    if !input.owner {
        assert_eq!(merge_policies(&policies).is_allowed(&args), serial);
    }
});
