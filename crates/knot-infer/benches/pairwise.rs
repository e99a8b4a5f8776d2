use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use knot_core::cancel::CancellationToken;
use knot_core::config::InferenceConfig;
use knot_core::model::CanonicalObject;
use knot_infer::fusion::FusionEngine;
use knot_infer::pairs::PairIndices;
use knot_infer::{EmbeddingIndex, NoopObserver};

const SIZES: [usize; 3] = [100, 400, 1_000];
const VOCAB: [&str; 12] = [
    "auth", "login", "billing", "checkout", "search", "cache", "deploy", "latency", "mobile",
    "export", "import", "webhook",
];
const DIM: usize = 64;

/// Deterministic objects with overlapping keyword sets and pseudo-random embeddings.
fn corpus(n: usize) -> (Vec<CanonicalObject>, EmbeddingIndex) {
    let mut state = 0xB0E5_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut objects = Vec::with_capacity(n);
    let mut index = EmbeddingIndex::new();
    for i in 0..n {
        let id = format!("jira-p{}-{i}", i % 7);
        let mut obj = CanonicalObject::new(id.as_str());
        obj.properties.keywords = (0..4)
            .map(|_| VOCAB[(next() % VOCAB.len() as u64) as usize].to_string())
            .collect();
        let vector = (0..DIM).map(|_| (next() % 1000) as f32 / 1000.0).collect();
        index.insert(id, vector);
        objects.push(obj);
    }
    (objects, index)
}

fn bench_fusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("fusion.pairwise");
    let config = InferenceConfig {
        use_semantic_similarity: true,
        use_project_metadata: true,
        ..InferenceConfig::default()
    };

    for n in SIZES {
        let (objects, index) = corpus(n);
        group.throughput(Throughput::Elements(PairIndices::total(n) as u64));
        group.bench_with_input(BenchmarkId::new("semantic+keyword+project", n), &n, |b, _| {
            let engine = FusionEngine::new(&config, &NoopObserver);
            let token = CancellationToken::new();
            b.iter(|| {
                let rels = engine
                    .run(black_box(&objects), Some(&index), &token)
                    .unwrap_or_default();
                black_box(rels.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("keyword", n), &n, |b, _| {
            let keyword_only = InferenceConfig::default();
            let engine = FusionEngine::new(&keyword_only, &NoopObserver);
            let token = CancellationToken::new();
            b.iter(|| {
                let rels = engine
                    .run(black_box(&objects), None, &token)
                    .unwrap_or_default();
                black_box(rels.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fusion);
criterion_main!(benches);
