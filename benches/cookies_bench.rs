use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fetchnet::cookies::CookieJar;
use url::Url;

fn benchmark_cookie_insert(c: &mut Criterion) {
    let jar = CookieJar::new();
    let url = Url::parse("https://example.com").unwrap();

    c.bench_function("cookie_parse_and_store", |b| {
        b.iter(|| {
            let _ = jar.set_cookie(black_box("foo=bar; Path=/; Secure"), black_box(&url));
        })
    });
}

fn benchmark_cookie_header(c: &mut Criterion) {
    let jar = CookieJar::new();
    let url = Url::parse("https://www.example.com/foo/bar").unwrap();
    for i in 0..40 {
        let domain = if i % 2 == 0 { "; Domain=example.com" } else { "" };
        let _ = jar.set_cookie(&format!("cookie{}=val; Path=/foo{}", i, domain), &url);
    }

    c.bench_function("cookie_header_for_url", |b| {
        b.iter(|| black_box(jar.header_value(black_box(&url))))
    });
}

criterion_group!(benches, benchmark_cookie_insert, benchmark_cookie_header);
criterion_main!(benches);
