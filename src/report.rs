//! Markdown reports built from a log's header and notes.
//!
//! Notes may ask for plots with a callout:
//!
//! ```text
//! \p{time, temp(0, 2), mass(1)[1e-3]}
//!     (time [s], temperature [K], warm-up)
//! ```
//!
//! The first variable is the x axis, the rest are y series. `(0, 2)` picks
//! the datasets to draw from (default: the dataset the note belongs to, or
//! every dataset for callouts in the header) and `[1e-3]` scales the
//! values. The label group is `(x label, y label, title)`; at most one line
//! break may separate it from the variables.
//!
//! Rendering swaps each callout for a `![](title.png)` link and collects a
//! [`PlotRequest`]; [`resolve`] turns a request into numeric series. Drawing
//! the image is left to the caller.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use serde::Serialize;

use crate::data::classify::parse_number;
use crate::data::loader::LogFile;
use crate::data::model::Dataset;
use crate::error::{LogError, Result};

fn callout_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\\p\{(?P<vars>.+)\}\n?[ \t]*\((?P<labels>.+)\)").expect("valid callout regex")
    })
}

fn variable_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?P<name>[\w\s]+)(?P<tests>\((?:\s*\d+\s*,)*\s*\d+\s*\))?(?P<scale>\[\s*[-\d.+Ee]+\s*\])?,?",
        )
        .expect("valid variable regex")
    })
}

// ---------------------------------------------------------------------------
// Plot requests
// ---------------------------------------------------------------------------

/// One variable named in a callout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableRef {
    pub name: String,
    /// Dataset indices to plot from.
    pub tests: Vec<usize>,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRequest {
    pub x: VariableRef,
    pub y: Vec<VariableRef>,
    pub xlabel: String,
    pub ylabel: String,
    pub title: String,
    /// File name the markdown link points at.
    pub savename: String,
}

/// A y series drawn against its x values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub test: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlot {
    pub request: PlotRequest,
    pub series: Vec<Series>,
}

/// Rendered markdown plus the plots it links to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub markdown: String,
    pub plots: Vec<PlotRequest>,
}

// ---------------------------------------------------------------------------
// Callout parsing
// ---------------------------------------------------------------------------

/// Replace every callout in `text` with a markdown image link.
///
/// Variables without explicit test indices get `default_tests`.
pub fn rewrite_callouts(text: &str, default_tests: &[usize]) -> Result<(String, Vec<PlotRequest>)> {
    let mut out = String::with_capacity(text.len());
    let mut plots = Vec::new();
    let mut last = 0;

    for caps in callout_format().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let plot = parse_callout(&caps, default_tests)?;

        out.push_str(&text[last..whole.start()]);
        out.push_str(&format!("![]({})", plot.savename.replace(' ', "%20")));
        last = whole.end();
        plots.push(plot);
    }
    out.push_str(&text[last..]);
    Ok((out, plots))
}

fn parse_callout(caps: &Captures<'_>, default_tests: &[usize]) -> Result<PlotRequest> {
    let labels: Vec<&str> = caps["labels"].split(',').map(str::trim).collect();
    let [xlabel, ylabel, title] = labels[..] else {
        return Err(LogError::report(format!(
            "plot callout needs (x label, y label, title), got ({})",
            &caps["labels"]
        )));
    };

    let mut vars = Vec::new();
    for m in variable_format().captures_iter(&caps["vars"]) {
        let name = m["name"].trim();
        if name.is_empty() {
            continue;
        }
        let tests = match m.name("tests") {
            Some(t) => t
                .as_str()
                .trim_matches(['(', ')'])
                .split(',')
                .filter_map(|n| n.trim().parse::<usize>().ok())
                .collect(),
            None => default_tests.to_vec(),
        };
        let scale = match m.name("scale") {
            Some(s) => {
                let raw = s.as_str().trim_matches(['[', ']']);
                parse_number(raw)
                    .ok_or_else(|| LogError::report(format!("bad scale factor [{raw}] for {name}")))?
            }
            None => 1.0,
        };
        vars.push(VariableRef {
            name: name.to_string(),
            tests,
            scale,
        });
    }

    let mut vars = vars.into_iter();
    let x = vars
        .next()
        .ok_or_else(|| LogError::report(format!("plot '{title}' names no variables")))?;
    let y: Vec<VariableRef> = vars.collect();
    if y.is_empty() {
        return Err(LogError::report(format!("plot '{title}' has no y variable")));
    }

    Ok(PlotRequest {
        x,
        y,
        xlabel: xlabel.to_string(),
        ylabel: ylabel.to_string(),
        title: title.to_string(),
        savename: format!("{title}.png"),
    })
}

// ---------------------------------------------------------------------------
// Report assembly
// ---------------------------------------------------------------------------

/// Header followed by every dataset's notes, callouts rewritten.
pub fn render(log: &LogFile, delimiter: &str) -> Result<Report> {
    let all: Vec<usize> = (0..log.n_logs()).collect();
    let mut markdown = String::new();
    let mut plots = Vec::new();

    if !log.header().is_empty() {
        let (text, found) = rewrite_callouts(log.header(), &all)?;
        markdown.push_str(&text);
        markdown.push('\n');
        plots.extend(found);
    }

    for i in all {
        let ds = log.get_log(i, delimiter)?;
        let (text, found) = rewrite_callouts(&ds.notes, &[i])?;
        markdown.push_str(&text);
        markdown.push('\n');
        plots.extend(found);
    }

    log::debug!("report for {}: {} plot(s)", log.path().display(), plots.len());
    Ok(Report { markdown, plots })
}

/// Look up the numbers behind a plot request.
pub fn resolve(plot: &PlotRequest, datasets: &[Arc<Dataset>]) -> Result<ResolvedPlot> {
    let mut series = Vec::new();
    for y in &plot.y {
        for &test in &y.tests {
            let ds = datasets.get(test).ok_or_else(|| {
                LogError::report(format!(
                    "plot '{}' asks for test {test} but there are {}",
                    plot.title,
                    datasets.len()
                ))
            })?;
            let column = |name: &str, scale: f64| {
                ds.column_by_name(name)
                    .map(|v| v.into_iter().map(|x| x * scale).collect::<Vec<f64>>())
                    .ok_or_else(|| {
                        LogError::report(format!("test {test} has no column '{name}'"))
                    })
            };
            series.push(Series {
                label: format!("{} : Test {test}", y.name),
                test,
                x: column(&plot.x.name, plot.x.scale)?,
                y: column(&y.name, y.scale)?,
            });
        }
    }
    Ok(ResolvedPlot {
        request: plot.clone(),
        series,
    })
}
