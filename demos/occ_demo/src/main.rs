//! Optimistic Concurrency Example
//!
//! Runs the same load / modify / external write / save sequence against a
//! bare record and a versioned record, then races several threads against a
//! single token.
//!
//! ```text
//! cargo run -p occ_demo                    # built-in scenarios, in-memory store
//! cargo run -p occ_demo -- demo.ron        # scenarios from a RON file
//! ROWVER_DB=rows.db cargo run -p occ_demo  # file-backed store
//! RUST_LOG=rowver_session=debug cargo run -p occ_demo
//! ```

use rowver_core::RecordKind;
use rowver_db::Store;
use rowver_session::{
    attempt_save, contend, reload, run, DemoConfig, ScenarioOutcome, ScenarioReport,
};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Rowver Optimistic Concurrency Example ===\n");

    let config = match env::args().nth(1) {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    let store = match env::var_os("ROWVER_DB") {
        Some(path) => Store::open(path)?,
        None => Store::in_memory()?,
    };
    info!(scenarios = config.scenarios.len(), "starting demo");

    for scenario in &config.scenarios {
        let report = run(&store, scenario)?;
        print_report(&report);

        // A conflict is resolved here by reloading and reapplying the local edits
        if let ScenarioOutcome::ConflictDetected(conflict) = &report.outcome {
            let mut fresh = reload(&store, conflict)?;
            fresh.apply(&scenario.local);
            let applied = attempt_save(&store, &fresh)?;
            println!("  Reloaded and retried: token {} -> {}", conflict.actual, applied.token);
            println!("  Row now: {}", applied.record.fields);
        }
        println!();
    }

    let seed = config
        .scenarios
        .iter()
        .find(|s| s.kind == RecordKind::Versioned)
        .map(|s| s.seed.clone())
        .unwrap_or_default();
    store.reset_versioned(seed.record_id(), &seed.fields())?;

    let contenders = config.contenders();
    println!("Racing {} writers against one token...", contenders);
    let race = contend(&store, seed.record_id(), contenders)?;
    println!(
        "  applied: {}, conflicts: {}, winner: {}",
        race.applied,
        race.conflicts,
        race.winner.map_or("none".to_string(), |w| format!("writer {}", w)),
    );
    println!("  Row now: {} token={}", race.final_record.fields, race.final_record.token);

    println!("\nTokens issued: {}", store.tokens_issued()?);
    println!("\n=== Demo Complete ===");
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    println!("--- {} ({}) ---", report.name, report.kind);
    for snapshot in report.snapshots.iter() {
        println!("  {}", snapshot);
    }
    for (from, to, diffs) in report.diffs() {
        if diffs.is_empty() {
            continue;
        }
        let rendered: Vec<String> = diffs.iter().map(|d| d.to_string()).collect();
        println!("  {} -> {}: {}", from, to, rendered.join(", "));
    }
    println!("  Outcome: {}", report.outcome);
    println!(
        "  Took {} us",
        (report.finished_at - report.started_at)
            .num_microseconds()
            .unwrap_or_default()
    );
}
