use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fetchnet::http::{Form, Part, RequestBody};

fn build_form(file_size: usize) -> Form {
    Form::new()
        .text("title", "quarterly report")
        .text("tags", "finance\r\nq3")
        .part(
            "attachment",
            Part::bytes(vec![0x5au8; file_size])
                .file_name("report.bin")
                .content_type("application/octet-stream"),
        )
}

fn bench_multipart_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("multipart_encode");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let body = RequestBody::Multipart(build_form(size));
                black_box(futures::executor::block_on(body.materialize()))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_multipart_encode);
criterion_main!(benches);
