use std::sync::OnceLock;

use regex::Regex;

use super::classify::{classify, fields, ClassifiedLine};
use super::model::{Dataset, Diagnostic, MISSING};

fn date_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}[/.]\d{2}[/.]\d{2}").expect("valid date regex"))
}

fn time_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d\d:\d\d:\d\d").expect("valid time regex"))
}

// ---------------------------------------------------------------------------
// Extractor – fold over one dataset span
// ---------------------------------------------------------------------------

/// Demultiplexes a stream of lines into a data matrix and a notes channel.
///
/// Feed the span line by line with [`Extractor::push`], then call
/// [`Extractor::finish`]. Until the first data row arrives, the latest
/// non-blank text line is held back as a possible label row; it is promoted
/// to `labels` only if its field count matches the first data row, and is
/// otherwise returned to the notes at the position it was read.
///
/// The matrix width is settled in [`Extractor::finish`]: it is the most
/// common field count among the data rows (ties go to the count seen
/// first). Shorter rows are padded with [`MISSING`], longer rows lose their
/// extra fields, and every row whose count differs from that width gets one
/// [`Diagnostic::InconsistentRowWidth`].
#[derive(Debug)]
pub struct Extractor<'d> {
    source_index: usize,
    delimiter: &'d str,
    notes: Vec<String>,
    /// (position in `notes`, raw line)
    label_candidate: Option<(usize, String)>,
    labels: Option<Vec<String>>,
    /// (source line, parsed fields) in file order, not yet rectangular
    rows: Vec<(usize, Vec<f64>)>,
    date: Option<String>,
    start_time: Option<String>,
}

impl<'d> Extractor<'d> {
    pub fn new(source_index: usize, delimiter: &'d str) -> Self {
        Extractor {
            source_index,
            delimiter,
            notes: Vec::new(),
            label_candidate: None,
            labels: None,
            rows: Vec::new(),
            date: None,
            start_time: None,
        }
    }

    /// Look for a date and start time in text that is not part of the span
    /// (the marker line itself).
    pub fn scan_timestamps(&mut self, text: &str) {
        if self.date.is_none() {
            self.date = date_format().find(text).map(|m| m.as_str().to_string());
        }
        if self.start_time.is_none() {
            self.start_time = time_format().find(text).map(|m| m.as_str().to_string());
        }
    }

    /// Classify and absorb one line. `line_no` is the 0-based line number in
    /// the source file, used only for diagnostics.
    pub fn push(&mut self, line_no: usize, line: &str) {
        match classify(line, self.delimiter) {
            ClassifiedLine::Text(raw) => self.push_text(raw),
            ClassifiedLine::Data(values) => self.push_row(line_no, values),
        }
    }

    fn push_text(&mut self, raw: String) {
        self.scan_timestamps(&raw);
        if !self.rows.is_empty() || raw.trim().is_empty() {
            self.notes.push(raw);
            return;
        }
        self.release_candidate();
        self.label_candidate = Some((self.notes.len(), raw));
    }

    fn release_candidate(&mut self) {
        if let Some((pos, raw)) = self.label_candidate.take() {
            self.notes.insert(pos, raw);
        }
    }

    fn push_row(&mut self, line_no: usize, values: Vec<f64>) {
        if self.rows.is_empty() {
            self.resolve_labels(values.len());
        }
        self.rows.push((line_no, values));
    }

    fn resolve_labels(&mut self, first_width: usize) {
        let Some((pos, raw)) = self.label_candidate.take() else {
            return;
        };
        let names = fields(&raw, self.delimiter);
        if names.len() == first_width {
            self.labels = Some(names.into_iter().map(str::to_string).collect());
        } else {
            log::debug!(
                "dataset {}: '{raw}' has {} fields against {} columns, kept as notes",
                self.source_index,
                names.len(),
                first_width
            );
            self.notes.insert(pos, raw);
        }
    }

    pub fn finish(mut self) -> Dataset {
        self.release_candidate();

        let width = modal_width(self.rows.iter().map(|(_, r)| r.len()));
        let mut data = Vec::with_capacity(self.rows.len());
        let mut diagnostics = Vec::new();
        for (row, (line, mut values)) in self.rows.into_iter().enumerate() {
            let found = values.len();
            if found != width {
                let diagnostic = Diagnostic::InconsistentRowWidth {
                    row,
                    line,
                    expected: width,
                    found,
                };
                log::warn!("dataset {}: {diagnostic}", self.source_index);
                diagnostics.push(diagnostic);
                values.resize(width, MISSING);
            }
            data.push(values);
        }

        Dataset {
            source_index: self.source_index,
            notes: self.notes.join("\n"),
            labels: self.labels,
            data,
            diagnostics,
            delimiter: self.delimiter.to_string(),
            date: self.date,
            start_time: self.start_time,
        }
    }
}

/// Most frequent value; ties go to the one that appeared first. 0 when empty.
fn modal_width(widths: impl Iterator<Item = usize>) -> usize {
    // (width, count) in first-seen order
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for w in widths {
        match counts.iter_mut().find(|(seen, _)| *seen == w) {
            Some((_, n)) => *n += 1,
            None => counts.push((w, 1)),
        }
    }
    let mut best = (0, 0);
    for (w, n) in counts {
        if n > best.1 {
            best = (w, n);
        }
    }
    best.0
}

/// Run the extractor over an in-memory span. Line numbers start at 0.
pub fn extract_lines<'a, I>(source_index: usize, lines: I, delimiter: &str) -> Dataset
where
    I: IntoIterator<Item = &'a str>,
{
    let mut extractor = Extractor::new(source_index, delimiter);
    for (line_no, line) in lines.into_iter().enumerate() {
        extractor.push(line_no, line);
    }
    extractor.finish()
}
