//! 邻居选择器基准测试
//!
//! 测试大规模邻居集合下的选择性能

use cluster_vitals::check::result::Peer;
use cluster_vitals::check::select_peers;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn make_peers(count: usize) -> Vec<Peer> {
    (0..count)
        .map(|i| Peer {
            node_name: format!("node-{i:05}"),
            pod_ip: format!("10.{}.{}.{}", i / 65536, (i / 256) % 256, i % 256),
        })
        .collect()
}

/// 邻居选择基准测试
fn selector_benchmark(c: &mut Criterion) {
    let peers = make_peers(1000);

    c.bench_function("select_peers_1000_limit_10", |b| {
        b.iter(|| {
            let selected = select_peers(black_box(peers.clone()), black_box(10));
            black_box(selected)
        });
    });

    c.bench_function("select_peers_1000_unlimited", |b| {
        b.iter(|| {
            let selected = select_peers(black_box(peers.clone()), black_box(0));
            black_box(selected)
        });
    });
}

criterion_group!(benches, selector_benchmark);
criterion_main!(benches);
