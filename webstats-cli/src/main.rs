// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Webstats CLI
//!
//! Runs stats jobs over a JSON-lines event log and writes the bound rows as
//! JSON lines.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webstats_core::{KpiKind, RawEvent};
use webstats_transformer::{
    CachedDimensionConverter, InMemoryDimensionConverter, JobConfig, JobKind, JobReport,
    JsonLinesSink, Pipeline,
};

const CONVERTER_CACHE_CAPACITY: u64 = 100_000;

#[derive(Parser)]
#[command(name = "webstats")]
#[command(about = "Webstats - web analytics log transformer", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output reports as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run stats jobs over an event log
    Run {
        /// Event log, one JSON object per line ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Row output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Jobs to run, overriding the configuration (repeatable)
        #[arg(long = "job")]
        jobs: Vec<String>,

        /// Run date stamped on rows (YYYY-MM-DD)
        #[arg(long)]
        run_date: Option<String>,

        /// Parallel map workers
        #[arg(long)]
        workers: Option<usize>,

        /// Write the dimension id assignments to this file as JSON
        #[arg(long)]
        dimensions: Option<PathBuf>,
    },

    /// List KPIs with their combination rule, accumulation rule and table
    Kpis,

    /// List jobs and the KPIs each one produces
    Jobs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, rows may go to stdout
    let default_filter = if cli.verbose {
        "webstats=debug,webstats_core=debug,webstats_transformer=debug"
    } else {
        "webstats=info,webstats_transformer=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            input,
            output,
            jobs,
            run_date,
            workers,
            dimensions,
        } => {
            let mut config = JobConfig::load(cli.config).context("Failed to load configuration")?;
            if !jobs.is_empty() {
                config.job.jobs = jobs;
            }
            if let Some(run_date) = run_date {
                config.job.run_date = run_date;
            }
            if let Some(workers) = workers {
                config.job.map_workers = workers;
            }
            config.validate().context("Invalid configuration")?;

            let records = read_events(&input)?;
            let reports = run_jobs(&config, &records, output.as_deref(), dimensions.as_deref())?;
            print_reports(&reports, cli.json)?;
        }

        Commands::Kpis => {
            if cli.json {
                let kpis: Vec<_> = KpiKind::ALL
                    .iter()
                    .map(|kpi| {
                        serde_json::json!({
                            "kpi": kpi.as_str(),
                            "combination": format!("{:?}", kpi.combination_rule()),
                            "accumulation": kpi.accumulation_rule().as_str(),
                            "table": kpi.output_table().name(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&kpis)?);
            } else {
                println!(
                    "{:<26} {:<18} {:<20} {}",
                    "KPI", "COMBINATION", "ACCUMULATION", "TABLE"
                );
                for kpi in KpiKind::ALL {
                    println!(
                        "{:<26} {:<18} {:<20} {}",
                        kpi.as_str(),
                        format!("{:?}", kpi.combination_rule()),
                        kpi.accumulation_rule().as_str(),
                        kpi.output_table()
                    );
                }
            }
        }

        Commands::Jobs => {
            for job in JobKind::ALL {
                let kpis: Vec<&str> = job.kpis().iter().map(|kpi| kpi.as_str()).collect();
                println!("{:<18} {}", job.as_str(), kpis.join(", "));
            }
        }
    }

    Ok(())
}

/// Parse the event log, skipping lines that are not event objects
fn read_events(input: &str) -> Result<Vec<RawEvent>> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(input).with_context(|| format!("Failed to open input {input}"))?;
        Box::new(BufReader::new(file))
    };

    let mut records = Vec::new();
    let mut skipped = 0u64;
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawEvent>(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                warn!(line = index + 1, error = %err, "skipping unparseable record");
            }
        }
    }

    info!(records = records.len(), skipped, "event log loaded");
    Ok(records)
}

fn run_jobs(
    config: &JobConfig,
    records: &[RawEvent],
    output: Option<&Path>,
    dimensions: Option<&Path>,
) -> Result<Vec<JobReport>> {
    let deps = config.mapper_deps().context("Failed to build job collaborators")?;
    let jobs = config.job_kinds()?;
    if jobs.is_empty() {
        bail!("no jobs selected");
    }

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output {:?}", path))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut sink = JsonLinesSink::new(writer);

    // One id space for every job of the run
    let converter =
        CachedDimensionConverter::new(InMemoryDimensionConverter::new(), CONVERTER_CACHE_CAPACITY);

    let mut reports = Vec::with_capacity(jobs.len());
    for job in jobs {
        let pipeline = Pipeline::new(job, deps.clone())?.with_map_workers(config.job.map_workers);
        let report = pipeline
            .run(records, &converter, &mut sink)
            .with_context(|| format!("Job {job} failed"))?;
        reports.push(report);
    }
    let written = sink.written();
    sink.into_inner().context("Failed to flush rows")?;

    let stats = converter.stats();
    info!(
        rows = written,
        dimensions = converter.inner().len(),
        cache_hit_rate = stats.hit_rate,
        "run finished"
    );

    if let Some(path) = dimensions {
        let file =
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        serde_json::to_writer_pretty(file, &converter.inner().snapshot())
            .context("Failed to write dimension assignments")?;
        info!("Dimension assignments written to {:?}", path);
    }

    Ok(reports)
}

fn print_reports(reports: &[JobReport], json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }

    for report in reports {
        eprintln!("✓ {}", report.job);
        eprintln!(
            "  Scanned: {}, Input: {}, Filtered: {}, Facts: {}",
            report.scanned_records,
            report.counters.input_records,
            report.counters.filtered_records,
            report.counters.output_records
        );
        eprintln!(
            "  Shuffled: {}, Keys: {}, Rows: {}",
            report.shuffled_values,
            report.keys,
            report.total_rows()
        );
        for (table, rows) in &report.rows_by_table {
            eprintln!("    {table}: {rows}");
        }
        if report.registered_members > 0 {
            eprintln!("  Registered members: {}", report.registered_members);
        }
    }
    Ok(())
}
