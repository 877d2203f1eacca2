//! `bertrand status`: the runs on disk and how far each got.

use bertrand_simulation::{ANALYSIS_WINDOW, RunListing, RunSummary, list_runs};

use super::GlobalArgs;

pub async fn run(global: &GlobalArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(global)?;
    let root = &config.experiment.runs_root;
    let runs = list_runs(root)?;

    if json {
        let rows: Vec<serde_json::Value> = runs.iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("📊 Runs under {}", root.display());
    println!("==========================");
    if runs.is_empty() {
        println!("  No runs yet. Start one with `bertrand test`.");
        return Ok(());
    }

    println!(
        "  {:<12} {:<10} {:>9} {:>19} {:>10}",
        "Run", "Status", "Periods", "Mean profit", "Collusion"
    );
    for listing in &runs {
        let done = listing.log.len();
        let (profits, collusion) = match RunSummary::from_log(&listing.log, ANALYSIS_WINDOW) {
            Some(s) => (
                format!("${:.2} / ${:.2}", s.mean_profit[0], s.mean_profit[1]),
                format!("{:.3}", s.collusion_index),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "  {:<12} {:<10} {:>9} {:>19} {:>10}",
            listing.metadata.config.dir_name(),
            listing.metadata.status.to_string(),
            format!("{done}/{}", listing.metadata.config.num_periods),
            profits,
            collusion
        );
        if let Some(failure) = &listing.metadata.failure {
            println!("    ↳ {failure}");
        }
    }

    Ok(())
}

fn to_json(listing: &RunListing) -> serde_json::Value {
    serde_json::json!({
        "run": listing.metadata.config.dir_name(),
        "dir": listing.dir.display().to_string(),
        "status": listing.metadata.status,
        "num_periods": listing.metadata.config.num_periods,
        "last_completed_period": listing.metadata.last_completed_period,
        "failure": listing.metadata.failure,
        "summary": RunSummary::from_log(&listing.log, ANALYSIS_WINDOW),
    })
}
