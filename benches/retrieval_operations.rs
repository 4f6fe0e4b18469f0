//! Retrieval Engine Benchmarks
//!
//! Measures BM25 scoring and hybrid RRF retrieval over synthetic segment
//! corpora of increasing size, to catch regressions in the hot path that
//! runs once per single-document summarisation request.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use leafmark_summarizer::config::RetrievalConfig;
use leafmark_summarizer::model::Segment;
use leafmark_summarizer::retrieval::{retrieve, Bm25Corpus};

fn generate_segments(count: usize) -> Vec<Segment> {
    let vocabulary = [
        "summary", "document", "collection", "retrieval", "segment", "anthology", "tragedy",
        "comedy", "history", "poetry", "narrative", "character", "theme", "plot", "setting",
    ];

    (0..count)
        .map(|i| {
            let words: Vec<&str> = (0..60).map(|w| vocabulary[(i + w) % vocabulary.len()]).collect();
            let text = words.join(" ");
            let mut segment = Segment::new("bench_doc", i, text, vec![format!("Section {}", i % 10)]);
            segment.salience_score = (i % 10) as f32 / 10.0;
            segment
        })
        .collect()
}

fn bm25_scoring_benchmark(c: &mut Criterion) {
    let config = RetrievalConfig::default();
    let mut group = c.benchmark_group("bm25_score_all");

    for size in [100usize, 1_000, 5_000] {
        let segments = generate_segments(size);
        let corpus = Bm25Corpus::build(&segments, &config);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(corpus.score_all("tragedy narrative theme")));
        });
    }
    group.finish();
}

fn hybrid_retrieval_benchmark(c: &mut Criterion) {
    let config = RetrievalConfig::default();
    let mut group = c.benchmark_group("hybrid_retrieve");

    for size in [100usize, 1_000, 5_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || generate_segments(size),
                |mut segments| black_box(retrieve(&mut segments, "tragedy narrative theme", None, &config)),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bm25_scoring_benchmark, hybrid_retrieval_benchmark);
criterion_main!(benches);
