use criterion::{criterion_group, criterion_main};

mod network;

criterion_group!(
    benches,
    network::server::bench_parse_get,
    network::server::bench_parse_form,
    network::server::bench_multipart_upload
);
criterion_main!(benches);
