use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fetchnet::http::{canonicalize, HeaderList};
use std::collections::HashMap;

fn browser_headers() -> HeaderList {
    let mut headers = HeaderList::new();
    headers.append(
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    );
    headers.append("Accept-Encoding", "gzip, deflate, br");
    headers.append("Accept-Language", "en-GB,en;q=0.9");
    headers.append("Cache-Control", "max-age=0");
    headers.append(
        "Cookie",
        "WMF-Last-Access=xxxxxxxxxxx; WMF-Last-Access-Global=xxxxxxxxxxx; GeoIP=xxxxxxxxxxxxxxxxxxxxxxxxxxx; NetworkProbeLimit=0.001",
    );
    headers.append(
        "Sec-Ch-Ua",
        "\"Google Chrome\";v=\"117\", \"Not;A=Brand\";v=\"8\", \"Chromium\";v=\"117\"",
    );
    headers.append("Sec-Ch-Ua-Mobile", "?0");
    headers.append("Sec-Ch-Ua-Platform", "\"Linux\"");
    headers.append("Sec-Fetch-Dest", "document");
    headers.append("Sec-Fetch-Mode", "navigate");
    headers.append("Sec-Fetch-Site", "none");
    headers.append("Sec-Fetch-User", "?1");
    headers.append("Upgrade-Insecure-Requests", "1");
    headers.append(
        "User-Agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    );
    headers
}

fn benchmark_headers_to_header_map(c: &mut Criterion) {
    let headers = browser_headers();

    // Per-hop cost: clone plus conversion for hyper
    c.bench_function("headers_to_header_map", |b| {
        b.iter(|| black_box(headers.clone()).to_header_map())
    });
}

fn benchmark_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");

    let pairs: Vec<(String, String)> = browser_headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    group.bench_function("pairs", |b| {
        b.iter(|| black_box(canonicalize(pairs.clone())))
    });

    let mut multi: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in &pairs {
        multi.entry(k.clone()).or_default().push(v.clone());
    }
    multi.insert(
        "Set-Cookie".into(),
        vec!["a=1".into(), "b=2".into(), "c=3".into()],
    );
    group.bench_function("multi_value_map", |b| {
        b.iter(|| black_box(canonicalize(multi.clone())))
    });

    group.finish();
}

fn benchmark_lookup(c: &mut Criterion) {
    let headers = browser_headers();
    c.bench_function("headers_case_insensitive_get", |b| {
        b.iter(|| {
            black_box(headers.get("user-agent"));
            black_box(headers.contains("CONTENT-TYPE"));
        })
    });
}

criterion_group!(
    benches,
    benchmark_headers_to_header_map,
    benchmark_canonicalize,
    benchmark_lookup
);
criterion_main!(benches);
