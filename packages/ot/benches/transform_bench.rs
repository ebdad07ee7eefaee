use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ftext_ot::{transform, Operation};

/// A client that fell `backlog` revisions behind: its edit has to be
/// transformed against every operation committed since.
fn transform_against_backlog(c: &mut Criterion) {
    let base: String = "lorem ipsum dolor sit amet ".repeat(40);
    let base_len = base.chars().count();

    let mut group = c.benchmark_group("transform_against_backlog");
    for backlog in [10usize, 100, 1_000] {
        let mut history = Vec::with_capacity(backlog);
        let mut len = base_len;
        for i in 0..backlog {
            let at = (i * 37) % len;
            history.push(
                Operation::builder()
                    .retain(at)
                    .insert("x")
                    .retain(len - at)
                    .build(),
            );
            len += 1;
        }

        let incoming = Operation::builder()
            .retain(base_len / 2)
            .delete(3)
            .insert("edit")
            .retain(base_len - base_len / 2 - 3)
            .build();

        group.bench_with_input(BenchmarkId::from_parameter(backlog), &history, |b, history| {
            b.iter(|| {
                let mut op = incoming.clone();
                for committed in history {
                    op = transform(committed, black_box(&op)).unwrap().1;
                }
                op
            })
        });
    }
    group.finish();
}

fn compose_long_chain(c: &mut Criterion) {
    let mut text = String::from("hello");
    let mut ops = Vec::new();
    for i in 0..200 {
        let len = text.chars().count();
        let op = Operation::builder().retain(i % len).insert("ab").retain(len - i % len).build();
        text = op.apply(&text).unwrap();
        ops.push(op);
    }

    c.bench_function("compose_200_operations", |b| {
        b.iter(|| {
            ops.iter()
                .skip(1)
                .try_fold(ops[0].clone(), |acc, op| acc.compose(black_box(op)))
                .unwrap()
        })
    });
}

criterion_group!(benches, transform_against_backlog, compose_long_chain);
criterion_main!(benches);
