//! Lookup benchmarks
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use tempfile::TempDir;
use trackseek::index::{BucketTable, ChainNode, END_OF_CHAIN, KeyHasher, KeySigning, SearchIndex};
use trackseek::index::hash::djb2;
use trackseek::query::{Query, QueryExecutor, parse_query};
use trackseek::record::extract_field;
use trackseek::utils::SearchConfig;

const RECORD: &str = "\"Side A, Side B\",al1,2001-01-01,\"[{'artist_name': 'The Commas', 'artist_id': 'x'}]\",Label,185000,false,\"Quote \"\"Me\"\"\",1,77\n";

/// Catalogue of `albums` albums with `tracks` tracks each
fn create_catalogue(albums: usize, tracks: usize, bucket_count: usize) -> (TempDir, SearchConfig) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = SearchConfig {
        index_path: temp_dir.path().join("bench.index"),
        dataset_path: temp_dir.path().join("bench.csv"),
        bucket_count,
        ..SearchConfig::default()
    };
    let hasher = KeyHasher::new(bucket_count, config.max_key_len, config.key_signing);

    let mut csv = String::new();
    let mut heads = vec![END_OF_CHAIN; bucket_count];
    let mut nodes = Vec::new();
    for a in 0..albums {
        let album = format!("Album {a}");
        let artist = format!("Artist {}", a % 97);
        for t in 0..tracks {
            let offset = csv.len() as i64;
            csv.push_str(&format!(
                "\"{album}\",al{a},2001,\"[{{'artist_name': '{artist}'}}]\",L,{},false,\"Track {t}\",{t},50\n",
                1000 * (t + 1)
            ));
            let bucket = hasher.bucket_for_pair(&album, &artist);
            let node_offset = (bucket_count * 8 + nodes.len() * ChainNode::SIZE) as i64;
            nodes.push(ChainNode::new(offset, heads[bucket]));
            heads[bucket] = node_offset;
        }
    }

    let mut index = Vec::new();
    BucketTable::from_heads(heads).write_to(&mut index).expect("encode table");
    for node in &nodes {
        node.write_to(&mut index).expect("encode node");
    }
    fs::write(&config.index_path, index).expect("Failed to write index");
    fs::write(&config.dataset_path, csv).expect("Failed to write dataset");

    (temp_dir, config)
}

fn bench_hashing(c: &mut Criterion) {
    let long = "x".repeat(511);
    let mut group = c.benchmark_group("djb2");
    for key in ["a|b", "Abbey Road|The Beatles", long.as_str()] {
        group.bench_with_input(BenchmarkId::from_parameter(key.len()), &key, |b, k| {
            b.iter(|| djb2(black_box(k.as_bytes()), KeySigning::Signed))
        });
    }
    group.finish();
}

fn bench_field_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_field");
    for column in [1usize, 4, 8, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(column), &column, |b, &col| {
            b.iter(|| extract_field(black_box(RECORD), col))
        });
    }
    group.finish();
}

fn bench_query_parsing(c: &mut Criterion) {
    c.bench_function("parse_query", |b| {
        b.iter(|| parse_query(black_box(b"Abbey Road|The Beatles|Something"), '|'))
    });
}

fn bench_lookup(c: &mut Criterion) {
    let (_temp_dir, config) = create_catalogue(2000, 12, 4096);
    let index = SearchIndex::open(&config).expect("Failed to open index");

    let mut group = c.benchmark_group("lookup");

    group.bench_function("album_hit", |b| {
        let query = Query::new("Album 1234", "Artist 70", "").expect("valid query");
        b.iter(|| QueryExecutor::new(&index, &config).execute(black_box(&query)))
    });

    group.bench_function("song_filter", |b| {
        let query = Query::new("Album 1234", "Artist 70", "track 1").expect("valid query");
        b.iter(|| QueryExecutor::new(&index, &config).execute(black_box(&query)))
    });

    group.bench_function("miss", |b| {
        let query = Query::new("No Album", "No Artist", "").expect("valid query");
        b.iter(|| QueryExecutor::new(&index, &config).execute(black_box(&query)))
    });

    group.finish();
}

fn bench_index_open(c: &mut Criterion) {
    let (_temp_dir, config) = create_catalogue(200, 4, 500_000);

    c.bench_function("index_open_500k_buckets", |b| {
        b.iter(|| SearchIndex::open(black_box(&config)))
    });
}

criterion_group!(
    benches,
    bench_hashing,
    bench_field_extraction,
    bench_query_parsing,
    bench_lookup,
    bench_index_open,
);

criterion_main!(benches);
