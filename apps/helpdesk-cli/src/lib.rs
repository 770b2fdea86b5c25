//! Helpdesk CLI library
//!
//! Argument parsing, input loading and report printing for the `helpdesk`
//! binary. Every printer writes to an arbitrary [`Write`] so it can be tested
//! against an in-memory buffer.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use helpdesk_common::format_datetime;
use helpdesk_core::{
    ConfigLoader, DashboardMetrics, DedupReporter, HelpdeskConfig, MetricsAggregator, Normalizer,
    TaskGraph, Ticket, TicketPriority, TicketStatus,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "helpdesk")]
#[command(about = "Normalize helpdesk task exports and compute dashboard metrics")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file (JSON or YAML), applied after the default locations
    #[arg(long, short, global = true, env = "HELPDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Normalize raw task records and print the tickets as JSON
    Normalize {
        /// JSON file with raw task records
        file: PathBuf,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Compute dashboard metrics for raw task records
    Metrics {
        /// JSON file with raw task records
        file: PathBuf,
        /// Reference instant (RFC 3339), defaults to the local clock
        #[arg(long)]
        now: Option<String>,
        /// Print the metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the parent/child hierarchy of the tickets
    Graph {
        /// JSON file with raw task records
        file: PathBuf,
    },
    /// Inspect or generate configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Write a configuration file with every default value
    Sample {
        /// Destination path
        path: PathBuf,
        #[arg(long, short, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },
    /// Print the effective configuration
    Show,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

/// Resolve the effective configuration for this invocation
///
/// # Errors
/// Returns an error if the merged configuration is invalid
pub fn resolve_config(cli: &Cli) -> Result<HelpdeskConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
        loader = loader.add_config_path(path);
    }
    let mut config = loader.load().context("Failed to load configuration")?;

    if cli.verbose {
        config.logging.log_level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json_logs = true;
    }
    Ok(config)
}

/// Read raw task records from a JSON file
///
/// Accepts a bare array or an envelope object with a `results` or `data`
/// array. A single task object is treated as a one-element list.
///
/// # Errors
/// Returns an error if the file cannot be read or is not JSON
pub fn load_tasks(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(extract_records(value))
}

fn extract_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(records) => records,
        Value::Object(mut object) => {
            for key in ["results", "data"] {
                if let Some(Value::Array(records)) = object.remove(key) {
                    return records;
                }
            }
            vec![Value::Object(object)]
        }
        other => vec![other],
    }
}

/// Parse an RFC 3339 instant, keeping its offset
///
/// # Errors
/// Returns an error if the value is not RFC 3339
pub fn parse_now(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("Invalid --now value '{raw}', expected RFC 3339"))
}

/// Print tickets as a JSON array
///
/// # Errors
/// Returns an error if writing fails
pub fn print_tickets<W: Write>(tickets: &[Ticket], pretty: bool, writer: &mut W) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, tickets)?;
    } else {
        serde_json::to_writer(&mut *writer, tickets)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Print metrics as a human-readable report
///
/// # Errors
/// Returns an error if writing fails
pub fn print_metrics<W: Write>(metrics: &DashboardMetrics, writer: &mut W) -> Result<()> {
    if metrics.total_tickets == 0 {
        writeln!(writer, "No tickets found")?;
        return Ok(());
    }

    writeln!(writer, "Tickets: {}", metrics.total_tickets)?;
    writeln!(writer, "By status:")?;
    for status in TicketStatus::all() {
        writeln!(
            writer,
            "  {:<12} {:>5}  {:>5.1}%",
            status.as_str(),
            metrics.status_count(status),
            metrics.status_percentages.get(status)
        )?;
    }
    writeln!(writer, "By priority:")?;
    for priority in TicketPriority::all() {
        writeln!(
            writer,
            "  {:<12} {:>5}  {:>5.1}%",
            priority.as_str(),
            metrics.priority_counts.get(priority),
            metrics.priority_percentages.get(priority)
        )?;
    }
    writeln!(writer, "By category:")?;
    for (category, count) in &metrics.by_category {
        writeln!(writer, "  {category:<12} {count:>5}")?;
    }

    writeln!(writer, "Resolved today: {}", metrics.resolved_today)?;
    writeln!(writer, "Resolved this week: {}", metrics.resolved_this_week)?;
    writeln!(
        writer,
        "Average response time: {:.2} h ({:+.1}% vs previous window)",
        metrics.average_response_time_hours, metrics.response_time_variation
    )?;
    writeln!(
        writer,
        "Participants: {} ({} active)",
        metrics.total_participants, metrics.active_participants
    )?;
    writeln!(
        writer,
        "Unassigned: {} ({:.1}%)",
        metrics.unassigned_tickets, metrics.unassigned_percentage
    )?;
    writeln!(writer, "Resolution rate: {:.1}%", metrics.resolution_rate)?;
    Ok(())
}

fn branch<W: Write>(
    graph: &TaskGraph,
    titles: &HashMap<u64, &str>,
    id: u64,
    depth: usize,
    path: &mut Vec<u64>,
    writer: &mut W,
) -> Result<()> {
    let title = titles.get(&id).copied().unwrap_or("(missing)");
    writeln!(writer, "{}#{id} {title}", "  ".repeat(depth))?;
    path.push(id);
    for child in graph.children_of(id) {
        if !path.contains(&child) {
            branch(graph, titles, child, depth + 1, path, writer)?;
        }
    }
    path.pop();
    Ok(())
}

/// Print the ticket hierarchy as an indented tree
///
/// # Errors
/// Returns an error if writing fails
pub fn print_graph<W: Write>(tickets: &[Ticket], writer: &mut W) -> Result<()> {
    let real: Vec<Ticket> = tickets.iter().filter(|t| !t.is_fallback()).cloned().collect();
    if real.is_empty() {
        writeln!(writer, "No tickets found")?;
        return Ok(());
    }

    let graph = TaskGraph::from_tickets(&real);
    let titles: HashMap<u64, &str> =
        real.iter().map(|t| (t.id, t.title.as_str())).collect();

    let mut path = Vec::new();
    for root in graph.roots() {
        branch(&graph, &titles, root, 0, &mut path, writer)?;
    }

    let dangling = graph.dangling();
    if !dangling.is_empty() {
        let ids: Vec<String> = dangling.iter().map(|id| format!("#{id}")).collect();
        writeln!(writer, "Missing referenced tickets: {}", ids.join(", "))?;
    }
    if let Some(cycle) = graph.find_cycle() {
        let ids: Vec<String> = cycle.iter().map(|id| format!("#{id}")).collect();
        writeln!(writer, "Cycle detected: {}", ids.join(" -> "))?;
    }
    Ok(())
}

fn normalize_file(config: &HelpdeskConfig, file: &Path) -> Result<Vec<Ticket>> {
    let records = load_tasks(file)?;
    let reporter = Arc::new(DedupReporter::new(config.diagnostics.seen_capacity));
    let normalizer = Normalizer::new(config.normalizer.clone(), reporter.clone());
    let tickets = helpdesk_core::instrument_operation!("normalize", {
        normalizer.normalize_values(&records)
    });

    let fallbacks = tickets.iter().filter(|t| t.is_fallback()).count();
    info!(
        records = records.len(),
        fallbacks,
        anomalies = reporter.emitted().len(),
        "Normalized {}",
        file.display()
    );
    Ok(tickets)
}

/// Execute a parsed command against an already resolved configuration
///
/// # Errors
/// Returns an error if input cannot be read or output cannot be written
pub fn run<W: Write>(cli: &Cli, config: &HelpdeskConfig, writer: &mut W) -> Result<()> {
    match &cli.command {
        Commands::Normalize { file, pretty } => {
            let tickets = normalize_file(config, file)?;
            print_tickets(&tickets, *pretty, writer)?;
        }
        Commands::Metrics { file, now, json } => {
            let tickets = normalize_file(config, file)?;
            let now = match now {
                Some(raw) => parse_now(raw)?,
                None => Local::now().fixed_offset(),
            };
            debug!(now = %format_datetime(&now.with_timezone(&Utc)), "Aggregating metrics");
            let metrics = MetricsAggregator::new(config.metrics.clone()).aggregate_at(&tickets, now);
            if *json {
                serde_json::to_writer_pretty(&mut *writer, &metrics)?;
                writeln!(writer)?;
            } else {
                print_metrics(&metrics, writer)?;
            }
        }
        Commands::Graph { file } => {
            let tickets = normalize_file(config, file)?;
            print_graph(&tickets, writer)?;
        }
        Commands::Config { action } => match action {
            ConfigCommand::Sample { path, format } => {
                HelpdeskConfig::default()
                    .to_file(path, format.as_str())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                writeln!(writer, "Wrote sample configuration to {}", path.display())?;
            }
            ConfigCommand::Show => {
                serde_json::to_writer_pretty(&mut *writer, config)?;
                writeln!(writer)?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_records_shapes() {
        assert_eq!(extract_records(json!([{"id": 1}, {"id": 2}])).len(), 2);
        assert_eq!(extract_records(json!({"results": [{"id": 1}]})).len(), 1);
        assert_eq!(extract_records(json!({"data": [{"id": 1}, {"id": 2}]})).len(), 2);
        assert_eq!(extract_records(json!({"id": 5})), vec![json!({"id": 5})]);
        assert_eq!(extract_records(json!(7)), vec![json!(7)]);
    }

    #[test]
    fn test_parse_now_keeps_offset() {
        let now = parse_now("2024-06-15T12:00:00+02:00").unwrap();
        assert_eq!(now.offset().local_minus_utc(), 7200);
        assert!(parse_now("yesterday").is_err());
    }

    #[test]
    fn test_print_metrics_empty() {
        let mut out = Vec::new();
        print_metrics(&DashboardMetrics::default(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No tickets found\n");
    }
}
