
use std::env;
use std::process::ExitCode;
use std::time::Instant;

use tagesim::*;
use tagesim::stats::*;
use tagesim::trace::*;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: {} <trace file> [seed]", args[0]);
        return ExitCode::FAILURE;
    }
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    let trace = match BinaryTrace::from_file(&args[1]) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("{}: {}", args[1], e);
            return ExitCode::FAILURE;
        },
    };
    println!("[*] Loaded {} records from {}",
        trace.num_entries(), trace.name()
    );

    let mut predictor = CompositePredictor::with_seed(seed);
    println!("[*] {} configuration:", predictor.name());
    println!("      {} tagged components per side, {} entries each",
        NUM_TAGGED_TABLES, 1usize << TAGGED_LOG2_SIZE,
    );
    println!("      {} base entries per side", 1usize << BASE_LOG2_SIZE);
    println!("      Geometric history lengths: {:?}", GEOMETRIC_LENGTHS);
    println!("      Allocation seed: {}", seed);

    let mut stats = TraceStats::new();
    let start = Instant::now();
    for record in trace.as_slice() {
        let prediction = predictor.predict(record);

        if record.is_conditional() {
            stats.record_direction(record, prediction.direction());
        }
        if record.is_indirect() {
            stats.record_target(record, prediction.target());
        }

        predictor.update(&prediction, record.outcome(), record.target());
    }
    let done = start.elapsed();
    println!("[*] ... simulated in {:.3?}", done);
    println!();

    println!("[*] Global statistics:");
    println!("      Unique branches:  {}", stats.num_unique_branches());
    if stats.conditional > 0 {
        println!("      Directions: {}/{} ({:.2}% correct) ({} misses)",
            stats.conditional - stats.direction_misses,
            stats.conditional,
            stats.direction_hit_rate() * 100.0,
            stats.direction_misses,
        );
    }
    if stats.indirect > 0 {
        println!("      Targets:    {}/{} ({:.2}% correct) ({} misses)",
            stats.indirect - stats.target_misses,
            stats.indirect,
            stats.target_hit_rate() * 100.0,
            stats.target_misses,
        );
    }
    println!("      MPKI: {:.3}", stats.mpki());
    println!();

    println!("[*] Predictor statistics:");
    println!("      TAGE:   {} allocations, {} failed, {} decays",
        predictor.tage.stat.allocs,
        predictor.tage.stat.failed_allocs,
        predictor.tage.stat.decays,
    );
    println!("      ITTAGE: {} allocations, {} failed, {} decays",
        predictor.ittage.stat.allocs,
        predictor.ittage.stat.failed_allocs,
        predictor.ittage.stat.decays,
    );

    println!();
    println!("[*] Most common branches:");
    for (pc, data) in stats.get_common_branches(8) {
        println!("      {:08x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }

    println!();
    println!("[*] Low hit-rate branches:");
    for (pc, data) in stats.get_low_rate_branches(8) {
        println!("      {:08x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }

    ExitCode::SUCCESS
}
