//! Criterion benchmarks for the search pipeline
//!
//! These benchmarks measure:
//! - Keyword occurrence counting over Latin and CJK text
//! - Relevance ranking of a result page
//! - Query body construction
//! - End-to-end search against the in-memory store

use chat_history_search::models::{ConversationDocument, MessageDocument, Role, TagDocument};
use chat_history_search::search::{
    occurrences, rank, DocumentIndexer, InMemoryStore, QueryBuilder, RelevanceWeights,
    SearchConfig, SearchHit, SearchQuery, SearchService,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use uuid::Uuid;

fn conversation(i: usize, messages: usize) -> ConversationDocument {
    let mut doc = ConversationDocument::new(Uuid::new_v4(), format!("Budget review {}", i));
    for m in 0..messages {
        let content = if m % 3 == 0 {
            format!("message {} talks about the budget for quarter {}", m, i % 4)
        } else {
            format!("message {} is about something else entirely", m)
        };
        doc.push_message(MessageDocument::new(Role::User, content));
    }
    doc.tags.push(TagDocument::new("finance"));
    doc
}

/// Benchmark keyword occurrence counting
fn bench_occurrences(c: &mut Criterion) {
    let latin = "the annual budget and the budgets of the budget office ".repeat(20);
    let cjk = "我想提高英语水平，英语电影也很好看。".repeat(20);

    let mut group = c.benchmark_group("occurrences");
    group.throughput(Throughput::Bytes(latin.len() as u64));
    group.bench_function("latin", |b| b.iter(|| occurrences(black_box(&latin), "budget")));
    group.throughput(Throughput::Bytes(cjk.len() as u64));
    group.bench_function("cjk", |b| b.iter(|| occurrences(black_box(&cjk), "英语")));
    group.finish();
}

/// Benchmark ranking a page of hits
fn bench_rank(c: &mut Criterion) {
    let weights = RelevanceWeights::default();
    let mut group = c.benchmark_group("rank");

    for size in [10usize, 50, 100] {
        let hits: Vec<SearchHit> = (0..size).map(|i| SearchHit::new(conversation(i, 20))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &hits, |b, hits| {
            b.iter(|| {
                let mut page = hits.clone();
                rank(&mut page, "budget", &weights);
                black_box(page)
            });
        });
    }

    group.finish();
}

/// Benchmark query body construction
fn bench_query_build(c: &mut Criterion) {
    let builder = QueryBuilder::new(SearchConfig::default());
    let query = SearchQuery::new("quarterly budget review")
        .with_user(Uuid::new_v4())
        .with_provider("claude");

    c.bench_function("query_build", |b| b.iter(|| builder.build(black_box(&query))));
}

/// Benchmark a full search against the in-memory store
fn bench_search(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    runtime.block_on(async {
        let docs: Vec<_> = (0..200).map(|i| conversation(i, 10)).collect();
        store.bulk_index("conversations", &docs).await.unwrap();
    });
    let service = SearchService::new(store, "conversations", SearchConfig::default());
    let query = SearchQuery::new("budget").with_limit(20);

    c.bench_function("search_in_memory", |b| {
        b.to_async(&runtime).iter(|| async { service.search(black_box(&query)).await.unwrap() });
    });
}

criterion_group!(benches, bench_occurrences, bench_rank, bench_query_build, bench_search);
criterion_main!(benches);
