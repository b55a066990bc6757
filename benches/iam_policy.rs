use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gatekeep::iam::{
    is_allowed_par_with, is_allowed_serial, merge_policies, Action, Args, Policy, Statement,
};

/// Policy mixing exact, wildcard and deny statements
fn create_complex_policy() -> Policy {
    Policy::from_json(
        r#"{
            "Version": "2012-10-17",
            "Statement": [
                {"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::public/*"},
                {"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"],
                 "Resource": "arn:aws:s3:::users/${aws:username}/*"},
                {"Effect": "Allow", "Action": "s3:List*", "Resource": "arn:aws:s3:::*"},
                {"Effect": "Deny", "Action": "s3:PutObject", "Resource": "arn:aws:s3:::system/*"}
            ]
        }"#,
    )
    .unwrap()
}

fn single_bucket_policy(i: usize) -> Policy {
    Policy::from_json(&format!(
        r#"{{"Statement": [{{"Effect": "Allow", "Action": "s3:GetObject",
            "Resource": "arn:aws:s3:::bucket-{}/*"}}]}}"#,
        i
    ))
    .unwrap()
}

fn get(bucket: &str, object: &str) -> Args {
    Args::new(Action::parse("s3:GetObject").unwrap(), bucket, object)
}

/// Indexed exact-action lookup (hot path)
fn bench_decide(c: &mut Criterion) {
    let eval_counts = vec![100, 1_000, 10_000];
    let policy = create_complex_policy();

    let mut group = c.benchmark_group("decide");

    for count in eval_counts {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("indexed", count), &count, |b, &count| {
            let args = get("public", "readme.md");
            b.iter(|| {
                for _ in 0..count {
                    black_box(policy.is_allowed(&args));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("full_scan", count), &count, |b, &count| {
            let unindexed = policy.without_index();
            let args = get("public", "readme.md");
            b.iter(|| {
                for _ in 0..count {
                    black_box(unindexed.is_allowed(&args));
                }
            });
        });
    }

    group.finish();
}

/// Deny vs allow vs no match
fn bench_deny_vs_allow(c: &mut Criterion) {
    let policy = create_complex_policy();
    let put = Action::parse("s3:PutObject").unwrap();

    let mut group = c.benchmark_group("deny_vs_allow");

    group.bench_function("allow_match", |b| {
        let args = get("public", "file.txt");
        b.iter(|| black_box(policy.decide(&args)));
    });

    group.bench_function("deny_match", |b| {
        let args = Args::new(put.clone(), "system", "config");
        b.iter(|| black_box(policy.decide(&args)));
    });

    group.bench_function("undecided", |b| {
        let args = get("private", "file.txt");
        b.iter(|| black_box(policy.decide(&args)));
    });

    group.finish();
}

/// Policy with many statements
fn bench_policy_complexity(c: &mut Criterion) {
    let statement_counts = vec![5, 25, 100];

    let mut group = c.benchmark_group("policy_complexity");

    for count in statement_counts {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let statements = (0..count)
                .map(|i| {
                    Statement::parse(
                        gatekeep::Effect::Allow,
                        &["s3:Get*"],
                        &[format!("arn:aws:s3:::path-{}/*", i).as_str()],
                    )
                    .unwrap()
                })
                .collect();
            let policy = Policy::new(statements);

            b.iter(|| {
                for i in 0..100 {
                    let bucket = format!("path-{}", i % count);
                    black_box(policy.is_allowed(&get(&bucket, "file.txt")));
                }
            });
        });
    }

    group.finish();
}

/// Serial vs parallel evaluation across many attached policies
fn bench_evaluators(c: &mut Criterion) {
    let policy_counts = vec![50, 200, 1_000];

    let mut group = c.benchmark_group("evaluators");

    for count in policy_counts {
        let policies: Vec<Policy> = (0..count).map(single_bucket_policy).collect();
        let args = get(&format!("bucket-{}", count - 1), "obj");

        group.bench_with_input(BenchmarkId::new("serial", count), &count, |b, _| {
            b.iter(|| black_box(is_allowed_serial(&policies, &args)));
        });

        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, _| {
            b.iter(|| black_box(is_allowed_par_with(&policies, &args, 25, 8)));
        });
    }

    group.finish();
}

/// Merging with dedup
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for count in [10, 100, 500] {
        // Every policy appears twice so half the statements are duplicates
        let policies: Vec<Policy> = (0..count)
            .chain(0..count)
            .map(single_bucket_policy)
            .collect();

        group.throughput(Throughput::Elements(policies.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &policies, |b, policies| {
            b.iter(|| black_box(merge_policies(policies)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decide,
    bench_deny_vs_allow,
    bench_policy_complexity,
    bench_evaluators,
    bench_merge,
);
criterion_main!(benches);
