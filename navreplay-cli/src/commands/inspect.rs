//! Inspect command - summarize a recorded history.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use clap::Args;
use console::style;
use navreplay::config::ConfigFile;
use navreplay::history::HistorySummary;

use super::common::{format_duration, load_sequence, resolve_order, OrderPolicy};
use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Recorded history file (JSON)
    pub path: PathBuf,

    /// Out-of-order timestamp policy
    #[arg(long, value_enum)]
    pub order: Option<OrderPolicy>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the inspect command.
pub fn run(args: InspectArgs, config: &ConfigFile) -> Result<(), CliError> {
    let order = resolve_order(args.order, config);
    let sequence = load_sequence(&args.path, order)?;
    let summary = HistorySummary::of(&sequence);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("{}", style(args.path.display()).bold());
    println!();
    println!("Events:      {}", summary.events);
    for (event_type, count) in &summary.by_type {
        println!("  {:<16} {}", event_type, count);
    }
    println!();
    println!("Recorded:    {}", format_time(summary.recording_start()));
    println!("Until:       {}", format_time(summary.recording_end()));
    println!(
        "Duration:    {}",
        format_duration(Duration::try_from_secs_f64(summary.duration_secs).unwrap_or_default())
    );
    if let Some(waypoints) = summary.initial_route_waypoints {
        println!("Initial route: {} waypoint(s)", waypoints);
    }
    if summary.out_of_order > 0 {
        println!(
            "{} {} record(s) go back in time (policy: {})",
            style("warning:").yellow().bold(),
            summary.out_of_order,
            order.name()
        );
    }
    Ok(())
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S%.3f %Z")
            .to_string(),
        None => "-".to_string(),
    }
}
