//! Kinfolk Headless Simulation Harness
//!
//! Generates a seeded village, runs the progression engine and checks the
//! pair invariants after every tick. Midway it unloads and reloads a few
//! villagers and round-trips the whole simulation through a save.
//!
//! Usage:
//!   cargo run -p kinfolk-simtest
//!   cargo run -p kinfolk-simtest -- --seed 7 --ticks 50000 --verbose
//!   RUST_LOG=kinfolk_core=debug cargo run -p kinfolk-simtest

use std::path::PathBuf;

use clap::Parser;
use kinfolk_core::generation::VillageConfig;
use kinfolk_core::prelude::*;
use kinfolk_logic::config::ConfigError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kinfolk-simtest")]
#[command(about = "Run a seeded village and audit every pair along the way")]
struct Args {
    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Ticks to simulate (20 ticks per second of game time)
    #[arg(long, default_value_t = 150_000)]
    ticks: u64,

    /// Village population
    #[arg(long, default_value_t = 80)]
    villagers: u32,

    /// Progression config (.toml or .json); defaults when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the mid-run save to this file instead of memory
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print passing checks and the event tally
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Kinfolk Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Configuration
    let config = match load_config(args.config.as_ref()) {
        Ok(config) => {
            results.push(TestResult::new("config_valid", true, "configuration accepted"));
            config
        }
        Err(e) => {
            results.push(TestResult::new("config_valid", false, e.to_string()));
            finish(&results, args.verbose);
            return;
        }
    };

    // 2. Village generation
    let mut engine = SimulationEngine::new(config, args.seed);
    let village = VillageConfig {
        population: args.villagers,
        ..Default::default()
    };
    results.extend(validate_generation(&mut engine, &village));

    // 3. First half of the run
    let half = args.ticks / 2;
    results.extend(run_audited(&mut engine, half, "first_half"));

    // 4. Partial unloading
    results.extend(validate_unload_reload(&mut engine));

    // 5. Save and load
    let (checks, restored) = validate_save_load(&engine, args.save.as_ref());
    results.extend(checks);

    // 6. Second half, live and restored side by side
    let remaining = args.ticks - half;
    results.extend(run_audited(&mut engine, remaining, "second_half"));
    if let Some(mut restored) = restored {
        restored.run(remaining);
        results.push(TestResult::new(
            "determinism_after_load",
            fingerprint(&restored) == fingerprint(&engine),
            format!("{} villagers compared after {} more ticks", engine.villager_count(), remaining),
        ));
    }

    // 7. Outcomes
    results.extend(validate_outcomes(&engine, args.verbose));

    // 8. Per-agent record corruption
    results.extend(validate_record_corruption(&mut engine));

    finish(&results, args.verbose);
}

fn finish(results: &[TestResult], verbose: bool) {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ProgressionConfig, ConfigError> {
    let config = match path {
        Some(path) => ProgressionConfig::load(path)?,
        None => ProgressionConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

type Fingerprint = Vec<(VillagerId, Option<ProgressionState>, Option<Marriage>, bool)>;

fn fingerprint(engine: &SimulationEngine) -> Fingerprint {
    engine
        .villager_ids()
        .into_iter()
        .map(|id| {
            (
                id,
                engine.progression(id),
                engine.marriage(id),
                engine.is_carrying(id),
            )
        })
        .collect()
}

// ── 2. Generation ───────────────────────────────────────────────────────

fn validate_generation(engine: &mut SimulationEngine, village: &VillageConfig) -> Vec<TestResult> {
    println!("--- Village Generation ---");
    let mut results = Vec::new();

    let ids = engine.generate(village);
    results.push(TestResult::new(
        "generation_population",
        ids.len() == village.population as usize && engine.villager_count() == ids.len(),
        format!("{} villagers in {}", ids.len(), village.name),
    ));

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    results.push(TestResult::new(
        "generation_unique_ids",
        sorted.len() == ids.len(),
        format!("{} distinct ids", sorted.len()),
    ));

    let one_sided: Vec<_> = ids
        .iter()
        .filter(|&&id| {
            let Some(spouse) = engine.marriage(id).and_then(|m| m.partner()) else {
                return false;
            };
            !engine
                .marriage(spouse)
                .is_some_and(|m| m.is_married_to(id))
        })
        .collect();
    results.push(TestResult::new(
        "generation_marriages_mutual",
        one_sided.is_empty(),
        if one_sided.is_empty() {
            "every arranged marriage points both ways".to_string()
        } else {
            format!("{} one-sided marriages", one_sided.len())
        },
    ));

    let missing = ids
        .iter()
        .filter(|&&id| engine.progression(id).is_none())
        .count();
    results.push(TestResult::new(
        "generation_progression_attached",
        missing == 0,
        format!("{} villagers without a progression state", missing),
    ));

    results
}

// ── 3/6. Audited run ────────────────────────────────────────────────────

fn run_audited(engine: &mut SimulationEngine, ticks: u64, label: &str) -> Vec<TestResult> {
    println!("--- Run: {} ({} ticks) ---", label, ticks);

    let mut healed = 0usize;
    let mut mate_unavailable = 0usize;
    let mut first_dirty_tick = None;

    for _ in 0..ticks {
        for fault in engine.tick() {
            match fault {
                ProgressionError::InvariantViolation(v) => {
                    healed += 1;
                    log::warn!("tick {}: {}", engine.current_tick(), v);
                }
                ProgressionError::MateUnavailable { .. } => mate_unavailable += 1,
                _ => {}
            }
        }
        if first_dirty_tick.is_none() && !engine.audit_pairs().is_empty() {
            first_dirty_tick = Some(engine.current_tick());
        }
    }

    vec![
        TestResult::new(
            &format!("{label}_no_violations"),
            healed == 0,
            format!("{} violations healed during ticks", healed),
        ),
        TestResult::new(
            &format!("{label}_audit_clean"),
            first_dirty_tick.is_none(),
            match first_dirty_tick {
                None => format!("{} pairs consistent after every tick", engine.pairs().len()),
                Some(tick) => format!("pair audit failed after tick {}", tick),
            },
        ),
        TestResult::new(
            &format!("{label}_mate_faults"),
            true,
            format!("{} mate-unavailable retries", mate_unavailable),
        ),
    ]
}

// ── 4. Unload / reload ──────────────────────────────────────────────────

fn validate_unload_reload(engine: &mut SimulationEngine) -> Vec<TestResult> {
    println!("--- Unload / Reload ---");
    let mut results = Vec::new();

    // One side of up to three live pairs goes away for a while.
    let victims: Vec<VillagerId> = engine.pairs().iter().take(3).map(|&(a, _)| a).collect();
    let mut snapshots = Vec::new();
    for &id in &victims {
        match engine.unload(id) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => results.push(TestResult::new("unload", false, e.to_string())),
        }
    }
    let gone = victims.iter().all(|&id| !engine.is_loaded(id));
    results.push(TestResult::new(
        "unload_removes_villagers",
        gone,
        format!("{} villagers unloaded", snapshots.len()),
    ));

    engine.run(200);

    let mut reloaded = 0;
    let mut record_faults = 0;
    for snapshot in snapshots {
        match engine.reload(snapshot) {
            Ok((_, faults)) => {
                reloaded += 1;
                record_faults += faults
                    .iter()
                    .filter(|f| matches!(f, ProgressionError::PersistenceCorruption { .. }))
                    .count();
            }
            Err(e) => results.push(TestResult::new("reload", false, e.to_string())),
        }
    }
    let violations = engine.audit_pairs();
    results.push(TestResult::new(
        "reload_reconciles_pairs",
        reloaded == victims.len() && violations.is_empty(),
        format!("{} reloaded, {} violations left", reloaded, violations.len()),
    ));
    results.push(TestResult::new(
        "reload_records_clean",
        record_faults == 0,
        format!("{} record faults", record_faults),
    ));

    results
}

// ── 5. Save / load ──────────────────────────────────────────────────────

fn validate_save_load(
    engine: &SimulationEngine,
    path: Option<&PathBuf>,
) -> (Vec<TestResult>, Option<SimulationEngine>) {
    println!("--- Save / Load ---");
    let mut results = Vec::new();
    let mut restored = SimulationEngine::default();

    let loaded = match path {
        Some(path) => engine
            .save_to_file(path)
            .and_then(|()| restored.load_from_file(path)),
        None => {
            let mut buffer = Vec::new();
            engine
                .save(&mut buffer)
                .and_then(|()| restored.load(buffer.as_slice()))
        }
    };

    match loaded {
        Ok(faults) => {
            results.push(TestResult::new(
                "load_without_faults",
                faults.is_empty(),
                format!("{} faults while loading", faults.len()),
            ));
            results.push(TestResult::new(
                "load_matches_saved",
                fingerprint(&restored) == fingerprint(engine)
                    && restored.current_tick() == engine.current_tick(),
                format!("{} villagers at tick {}", restored.villager_count(), restored.current_tick()),
            ));
            (results, Some(restored))
        }
        Err(e) => {
            results.push(TestResult::new("save_load", false, e.to_string()));
            (results, None)
        }
    }
}

// ── 7. Outcomes ─────────────────────────────────────────────────────────

fn validate_outcomes(engine: &SimulationEngine, verbose: bool) -> Vec<TestResult> {
    println!("--- Outcomes ---");
    let mut results = Vec::new();
    let cap = engine.config().max_children_per_pair.max(1);

    let over_cap: Vec<_> = engine
        .pairs()
        .into_iter()
        .filter(|&(a, _)| engine.progression(a).is_some_and(|s| s.child_count > cap))
        .collect();
    results.push(TestResult::new(
        "child_cap_respected",
        over_cap.is_empty(),
        format!("{} pairs over the cap of {}", over_cap.len(), cap),
    ));

    let (mut found, mut conceived, mut born) = (0, 0, 0);
    for event in engine.pending_events() {
        match event {
            LifeEvent::PartnerFound { .. } => found += 1,
            LifeEvent::ConceptionSucceeded { .. } => conceived += 1,
            LifeEvent::ChildBorn { .. } => born += 1,
        }
    }
    results.push(TestResult::new(
        "births_follow_conceptions",
        born <= conceived,
        format!("{} pairings, {} conceptions, {} births", found, conceived, born),
    ));

    if verbose {
        let mut by_step = std::collections::BTreeMap::new();
        for id in engine.villager_ids() {
            if let Some(state) = engine.progression(id) {
                *by_step.entry(format!("{:?}", state.step)).or_insert(0u32) += 1;
            }
        }
        for (step, count) in by_step {
            println!("  {:<22} {}", step, count);
        }
    }

    results
}

// ── 8. Record corruption ────────────────────────────────────────────────

fn validate_record_corruption(engine: &mut SimulationEngine) -> Vec<TestResult> {
    println!("--- Record Corruption ---");
    let loner = engine.spawn_villager(VillagerSpec::adult(Gender::Male).at(1.0e6, 0.0, 1.0e6));

    match engine.deserialize_progression(loner, "{\"step\": \"courting\"") {
        Ok(faults) => {
            let defaulted = engine
                .progression(loner)
                .is_some_and(|s| s.is_default(engine.config()));
            vec![TestResult::new(
                "corrupt_record_defaults",
                !faults.is_empty() && defaulted,
                format!("{} fields substituted", faults.len()),
            )]
        }
        Err(e) => vec![TestResult::new("corrupt_record_defaults", false, e.to_string())],
    }
}
