//! Timing and performance analysis utilities.

use super::report::BackendSummary;
use std::time::Instant;

/// Runs `f` and returns its result with the elapsed wall-clock time in milliseconds.
pub fn measure<T, F>(f: F) -> (T, f64)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let value = f();
    (value, start.elapsed().as_secs_f64() * 1000.0)
}

/// Prints the per-backend results, the speed ranking and the overhead of every
/// backend against the first one.
pub fn print_summary(title: &str, summaries: &[BackendSummary]) {
    if summaries.is_empty() {
        return;
    }

    let baseline = &summaries[0];

    println!("\n{}", "=".repeat(80));
    println!("{}", title);
    println!("{}", "=".repeat(80));

    for summary in summaries {
        println!("\n📊 {} ({} samples)", summary.name, summary.samples);
        println!("   Mean load time: {:.3} ms", summary.mean_load_ms);
        println!("   Mean inference time: {:.3} ms", summary.mean_infer_ms);
        println!("   Accuracy: {:.1}%", summary.accuracy * 100.0);
        println!("   Cold start load time: {:.3} ms", summary.cold_start_load_ms);
        println!(
            "   Trend: load {:+.4} ms/sample, inference {:+.4} ms/sample",
            summary.load_trend_ms_per_sample, summary.infer_trend_ms_per_sample
        );

        if summary.name != baseline.name {
            println!(
                "   Inference overhead vs {}: {:.2}x ({:.1}%)",
                baseline.name,
                summary.overhead_ratio(baseline),
                summary.overhead_percentage(baseline)
            );
        }
    }

    println!("\n🚀 Speed Rankings (fastest to slowest inference):");
    let mut sorted = summaries.to_vec();
    sorted.sort_by(|a, b| a.mean_infer_ms.total_cmp(&b.mean_infer_ms));

    for (i, summary) in sorted.iter().enumerate() {
        let rank_emoji = match i {
            0 => "🥇",
            1 => "🥈",
            2 => "🥉",
            _ => "  ",
        };
        println!(
            "   {} {}: {:.3} ms (load {:.3} ms)",
            rank_emoji, summary.name, summary.mean_infer_ms, summary.mean_load_ms
        );
    }
}
