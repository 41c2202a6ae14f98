use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Args, Parser, Subcommand};

use rusty_logbook::report;
use rusty_logbook::{Dataset, LogFile, LogFormat, Marker, ReaderConfig};

/// Pull numeric datasets out of interleaved logs
#[derive(Parser)]
#[command(name = "rusty-logbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dataset count and file header
    Info {
        #[command(flatten)]
        source: Source,
    },
    /// Print one dataset: notes, labels, diagnostics and data
    Show {
        #[command(flatten)]
        source: Source,
        /// Dataset index (0-based)
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        /// Read raw lines START..END instead of a dataset
        #[arg(long, requires = "end")]
        start: Option<usize>,
        #[arg(long, requires = "start")]
        end: Option<usize>,
        /// Print the data as CSV
        #[arg(long)]
        csv: bool,
        /// Print the whole dataset as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
    },
    /// Render a markdown report from header and notes
    Report {
        #[command(flatten)]
        source: Source,
        /// Print the resolved plot series as JSON instead of markdown
        #[arg(long)]
        plots: bool,
    },
}

#[derive(Args)]
struct Source {
    /// Log file to read
    path: PathBuf,
    /// Built-in marker preset: putty, lvm, lvmspl, nivb
    #[arg(short, long, conflicts_with_all = ["marker", "pattern"])]
    format: Option<LogFormat>,
    /// Dataset marker: any line containing this text
    #[arg(short, long, conflicts_with = "pattern")]
    marker: Option<String>,
    /// Dataset marker: any line matching this regex
    #[arg(short, long)]
    pattern: Option<String>,
    /// JSON reader configuration (marker and delimiter)
    #[arg(short, long, conflicts_with_all = ["format", "marker", "pattern"])]
    config: Option<PathBuf>,
    /// Field delimiter; an empty string splits on whitespace
    #[arg(short, long)]
    delimiter: Option<String>,
}

impl Source {
    fn open(&self) -> Result<(LogFile, String)> {
        let (marker, delimiter) = match &self.config {
            Some(path) => {
                let cfg = ReaderConfig::from_path(path)
                    .with_context(|| format!("loading config {}", path.display()))?;
                let delimiter = self.delimiter.clone().unwrap_or(cfg.delimiter);
                (cfg.marker.to_marker()?, delimiter)
            }
            None => {
                let marker = if let Some(format) = self.format {
                    format.marker()
                } else if let Some(text) = &self.marker {
                    Marker::substring(text.clone())
                } else if let Some(pattern) = &self.pattern {
                    Marker::pattern(pattern)?
                } else {
                    bail!("one of --format, --marker, --pattern or --config is required");
                };
                (marker, self.delimiter.clone().unwrap_or_else(|| ",".to_string()))
            }
        };

        let log = LogFile::open(&self.path, marker)
            .with_context(|| format!("indexing {}", self.path.display()))?;
        Ok((log, delimiter))
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { source } => info(&source),
        Commands::Show {
            source,
            index,
            start,
            end,
            csv,
            json,
        } => {
            let (log, delimiter) = source.open()?;
            let dataset = match (start, end) {
                (Some(start), Some(end)) => log.read_lines(start, end, &delimiter)?,
                _ => log
                    .get_log(index, &delimiter)
                    .with_context(|| format!("reading dataset {index}"))?
                    .as_ref()
                    .clone(),
            };
            if json {
                let mut out = io::stdout().lock();
                serde_json::to_writer_pretty(&mut out, &dataset)?;
                writeln!(out)?;
                Ok(())
            } else if csv {
                write_csv(&dataset)
            } else {
                show(&dataset)
            }
        }
        Commands::Report { source, plots } => {
            let (log, delimiter) = source.open()?;
            let rendered = report::render(&log, &delimiter)?;
            if plots {
                let datasets = log.get_all(&delimiter)?;
                let resolved = rendered
                    .plots
                    .iter()
                    .map(|p| report::resolve(p, &datasets))
                    .collect::<rusty_logbook::Result<Vec<_>>>()?;
                let mut out = io::stdout().lock();
                serde_json::to_writer_pretty(&mut out, &resolved)?;
                writeln!(out)?;
            } else {
                print!("{}", rendered.markdown);
            }
            Ok(())
        }
    }
}

fn info(source: &Source) -> Result<()> {
    let (log, _) = source.open()?;
    println!("file:     {}", log.path().display());
    println!("marker:   {}", log.marker());
    println!("datasets: {}", log.n_logs());
    for (i, span) in log.spans().iter().enumerate() {
        println!("  [{i}] lines {}..{}", span.start_line + 1, span.end_line);
    }
    if !log.header().is_empty() {
        println!("\n{}", log.header());
    }
    Ok(())
}

fn show(dataset: &Dataset) -> Result<()> {
    println!("dataset {}", dataset.source_index);
    if let Some(date) = &dataset.date {
        println!("date:  {date}");
    }
    if let Some(time) = &dataset.start_time {
        println!("start: {time}");
    }
    if !dataset.notes.is_empty() {
        println!("\n-- notes --\n{}", dataset.notes);
    }
    for d in &dataset.diagnostics {
        println!("warning: {d}");
    }
    println!("\n{} rows x {} cols", dataset.n_rows(), dataset.n_cols());
    if !dataset.is_empty() {
        let batch = dataset.to_record_batch()?;
        println!("{}", pretty_format_batches(&[batch])?);
    }
    Ok(())
}

fn write_csv(dataset: &Dataset) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.write_record(dataset.column_names())?;
    for row in &dataset.data {
        writer.write_record(
            row.iter()
                .map(|v| if v.is_nan() { String::new() } else { v.to_string() }),
        )?;
    }
    writer.flush().context("writing CSV")?;
    Ok(())
}
