use crate::index::chain::{ChainEnd, ChainWalker};
use crate::index::reader::SearchIndex;
use crate::utils::progress::{ProgressBar, bucket_progress};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;

/// Occupancy and integrity summary of a whole index
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ChainStats {
    pub buckets: usize,
    pub occupied_buckets: usize,
    pub nodes: usize,
    pub longest_chain: usize,
    pub longest_bucket: Option<usize>,
    pub mean_chain: f64,
    /// Chains cut short by a pointer outside the node area
    pub out_of_range: usize,
    /// Chains that loop back onto themselves
    pub cycles: usize,
    /// Chains whose nodes could not be read
    pub unreadable: usize,
    /// Nodes whose record offset lies outside the dataset
    pub bad_records: usize,
}

impl ChainStats {
    pub fn is_clean(&self) -> bool {
        self.out_of_range == 0 && self.cycles == 0 && self.unreadable == 0 && self.bad_records == 0
    }
}

struct BucketReport {
    bucket: usize,
    len: usize,
    bad_records: usize,
    end: ChainEnd,
}

/// Walk every occupied bucket and summarize what was found.
pub fn compute_stats(index: &SearchIndex, progress: &ProgressBar) -> Result<ChainStats> {
    File::open(index.index_path())
        .with_context(|| format!("Failed to open index {}", index.index_path().display()))?;

    let bounds = index.node_bounds();
    let heads: Vec<(usize, i64)> = index.buckets().occupied().collect();

    let reports: Vec<BucketReport> = heads
        .par_iter()
        .map_init(
            || File::open(index.index_path()),
            |file, &(bucket, head)| {
                progress.inc(1);
                let file = match file {
                    Ok(f) => f,
                    Err(e) => {
                        return BucketReport {
                            bucket,
                            len: 0,
                            bad_records: 0,
                            end: ChainEnd::Unreadable {
                                offset: head.max(0) as u64,
                                error: e.to_string(),
                            },
                        };
                    }
                };

                let mut walker = ChainWalker::new(BufReader::new(&*file), bounds, head);
                let mut len = 0;
                let mut bad_records = 0;
                for node in walker.by_ref() {
                    len += 1;
                    if !index.record_in_range(node.record_offset) {
                        bad_records += 1;
                    }
                }
                BucketReport {
                    bucket,
                    len,
                    bad_records,
                    end: walker.end().cloned().unwrap_or(ChainEnd::Complete),
                }
            },
        )
        .collect();
    progress.finish_and_clear();

    let mut stats = ChainStats {
        buckets: index.buckets().len(),
        occupied_buckets: reports.len(),
        ..ChainStats::default()
    };
    for report in &reports {
        stats.nodes += report.len;
        stats.bad_records += report.bad_records;
        if report.len > stats.longest_chain {
            stats.longest_chain = report.len;
            stats.longest_bucket = Some(report.bucket);
        }
        match report.end {
            ChainEnd::Complete => {}
            ChainEnd::Cycle { .. } => stats.cycles += 1,
            ChainEnd::OutOfRange { .. } => stats.out_of_range += 1,
            ChainEnd::Unreadable { .. } => stats.unreadable += 1,
        }
    }
    if stats.occupied_buckets > 0 {
        stats.mean_chain = stats.nodes as f64 / stats.occupied_buckets as f64;
    }

    Ok(stats)
}

/// Display index statistics
pub fn show_stats(index: &SearchIndex, json: bool) -> Result<()> {
    let progress = bucket_progress(index.buckets().occupied().count() as u64);
    let stats = compute_stats(index, &progress)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index file:       {}", index.index_path().display());
    println!("Index size:       {}", format_size(index.index_len()));
    println!("Dataset file:     {}", index.dataset_path().display());
    println!("Dataset size:     {}", format_size(index.dataset_len()));
    println!();
    println!("Buckets:          {}", stats.buckets);
    println!(
        "Occupied:         {} ({:.1}%)",
        stats.occupied_buckets,
        stats.occupied_buckets as f64 * 100.0 / stats.buckets.max(1) as f64
    );
    println!("Chain nodes:      {}", stats.nodes);
    println!("Mean chain:       {:.2}", stats.mean_chain);
    match stats.longest_bucket {
        Some(bucket) => println!("Longest chain:    {} (bucket {})", stats.longest_chain, bucket),
        None => println!("Longest chain:    0"),
    }

    println!();
    if stats.is_clean() {
        println!("Integrity:        ok");
    } else {
        println!("Integrity problems:");
        println!("  Out-of-range pointers: {}", stats.out_of_range);
        println!("  Cyclic chains:         {}", stats.cycles);
        println!("  Unreadable nodes:      {}", stats.unreadable);
        println!("  Bad record offsets:    {}", stats.bad_records);
    }

    Ok(())
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
