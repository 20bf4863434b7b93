//! desk-runner: headless report runner for the task desk engine.
//!
//! Usage:
//!   desk-runner --db desk.db --user ana --upload export.csv
//!   desk-runner --db desk.db --user ana --report monthly
//!   desk-runner --db desk.db --user ana --report ranking:overall
//!   desk-runner --db desk.db --user ana --report scorecard \
//!       --analyst joao --from 01/03/2025 --to 31/03/2025

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use taskdesk_core::{
    config::DeskConfig,
    dataset::DateRange,
    ranking, report,
    record::RawRow,
    store::{CorrectionLog, DeskStore},
    timefmt,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let user = arg_value(&args, "--user").unwrap_or("default");

    let config = match arg_value(&args, "--config") {
        Some(path) => DeskConfig::load(path).with_context(|| format!("loading config {path}"))?,
        None => DeskConfig::default(),
    };

    let mut store = DeskStore::open(db)?;
    store.migrate()?;

    if let Some(upload) = arg_value(&args, "--upload") {
        let raw_rows = read_csv(upload)?;
        let ds = store.ingest_upload(user, &raw_rows, &config)?;
        println!("ingested {} rows; dataset now holds {}", raw_rows.len(), ds.len());
        match store.correction_log(user)? {
            CorrectionLog::Entries(entries) => {
                println!("{} durations corrected:", entries.len());
                for e in &entries {
                    println!(
                        "  {} [{}] {} -> {}",
                        e.protocol,
                        e.outcome.as_str(),
                        timefmt::format_hms(Some(e.original)),
                        timefmt::format_hms(Some(e.corrected)),
                    );
                }
            }
            CorrectionLog::Clean(note) => println!("{note}"),
        }
    }

    if let Some(report_name) = arg_value(&args, "--report") {
        let ds = store.load(user);
        run_report(report_name, &ds, &config, &args)?;
    }

    Ok(())
}

fn run_report(name: &str, ds: &taskdesk_core::dataset::Dataset, config: &DeskConfig, args: &[String]) -> Result<()> {
    match name {
        "daily" => print!("{}", report::to_csv(&report::daily_mean_table(ds))?),
        "monthly" => print!("{}", report::to_csv(&report::monthly_overview(ds))?),
        "queues" => match taskdesk_core::aggregate::queue_summary(ds, config) {
            Ok(rows) => {
                for row in rows {
                    println!(
                        "{}: {} tasks ({} registered, {} updated, {} out of scope), \
                         TMO reg {} / upd {}",
                        row.queue,
                        row.total,
                        row.registered,
                        row.updated,
                        row.out_of_scope,
                        timefmt::format_hms(Some(row.mean_registered.mean())),
                        timefmt::format_hms(Some(row.mean_updated.mean())),
                    );
                }
            }
            Err(missing) => println!("{missing}"),
        },
        "idle" => match taskdesk_core::idle::idle_per_day(ds) {
            Ok(per_day) => {
                for ((assignee, day), idle) in &per_day {
                    println!("{assignee} {day}: {}", timefmt::format_hms(Some(*idle)));
                }
            }
            Err(missing) => println!("{missing}"),
        },
        "scorecard" => {
            let analyst = arg_value(args, "--analyst")
                .context("--report scorecard needs --analyst")?;
            let range = range_from_args(args)?;
            let card = report::analyst_scorecard(ds, analyst, range);
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        other => {
            if let Some(spec_name) = other.strip_prefix("ranking:") {
                let specs = ranking::catalog(config);
                let Some(spec) = specs.iter().find(|s| s.name == spec_name) else {
                    bail!(
                        "unknown ranking '{spec_name}'; available: {}",
                        specs
                            .iter()
                            .map(|s| s.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                };
                match ranking::rank(ds, spec, &[]) {
                    Ok(table) => print!("{}", report::to_csv(&report::ranking_rows(&table))?),
                    Err(missing) => println!("{missing}"),
                }
            } else {
                bail!("unknown report '{other}'");
            }
        }
    }
    Ok(())
}

fn range_from_args(args: &[String]) -> Result<DateRange> {
    let from = parse_day(arg_value(args, "--from").context("missing --from")?)?;
    let to = parse_day(arg_value(args, "--to").context("missing --to")?)?;
    Ok(DateRange::new(from, to))
}

fn parse_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%d/%m/%Y")
        .with_context(|| format!("expected DD/MM/YYYY, got '{text}'"))
}

fn arg_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

// ── Minimal CSV reading ──────────────────────────────────────────────────────
// The upload boundary expects columns supersetting the canonical schema;
// anything fancier than quoted fields belongs to the spreadsheet exporter,
// not to this runner.

fn read_csv(path: &str) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers = split_csv_line(header_line);

    let mut rows = Vec::new();
    for line in lines {
        let cells = split_csv_line(line);
        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            row.set(header, cell);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut cell));
            }
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}
