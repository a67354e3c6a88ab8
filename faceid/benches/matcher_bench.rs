use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use faceid::{euclidean_distance, Encoding, EncodingCache, IdentityRegistry, Matcher};

const DIM: usize = 128;

fn random_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.25);
    }
    v
}

fn registry(n: usize) -> IdentityRegistry {
    let mut reg = IdentityRegistry::new(DIM);
    for i in 0..n {
        reg.insert(format!("person{i}"), Encoding::new(random_vec(DIM, i as u64 + 1)))
            .unwrap();
    }
    reg
}

fn bench_distance(c: &mut Criterion) {
    let a = random_vec(DIM, 1);
    let b = random_vec(DIM, 2);
    c.bench_function("euclidean_distance_128d", |bench| {
        bench.iter(|| black_box(euclidean_distance(black_box(&a), black_box(&b))));
    });
}

fn bench_best_match(c: &mut Criterion) {
    let matcher = Matcher::default();
    let query = Encoding::new(random_vec(DIM, 999_999));

    let mut group = c.benchmark_group("best_match_128d");
    for n in [10, 100, 1_000, 10_000] {
        let reg = registry(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &reg, |b, reg| {
            b.iter(|| black_box(matcher.best_match(reg, black_box(&query))));
        });
    }
    group.finish();
}

fn bench_cache_save(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face_encodings.cache");
    let snapshot = EncodingCache::from_registry(&registry(1_000), "hog");

    c.bench_function("cache_save_1000", |b| {
        b.iter(|| snapshot.save(&path).unwrap());
    });
    c.bench_function("cache_load_1000", |b| {
        b.iter(|| black_box(EncodingCache::load(&path, "hog", DIM).unwrap()));
    });
}

criterion_group!(benches, bench_distance, bench_best_match, bench_cache_save);
criterion_main!(benches);
