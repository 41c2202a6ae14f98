use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Marker;
use crate::error::{LogError, Result};

use super::extract::Extractor;
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Span – where one dataset lives in the file
// ---------------------------------------------------------------------------

/// Location of one dataset. Content starts on the line after the marker and
/// runs up to (not including) the next marker line or end of file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// The marker line itself; `None` for the implicit dataset of a file
    /// without markers.
    pub marker_line: Option<String>,
    pub start_byte: u64,
    pub end_byte: u64,
    /// 0-based, inclusive.
    pub start_line: usize,
    /// 0-based, exclusive.
    pub end_line: usize,
}

// ---------------------------------------------------------------------------
// LogFile – index built once, datasets extracted on demand
// ---------------------------------------------------------------------------

/// A log file indexed by marker.
///
/// Opening the file scans it once for marker lines and records where every
/// dataset starts and stops, plus the header text above the first marker.
/// Datasets are parsed only when requested through [`LogFile::get_log`] and
/// are cached per index afterwards.
///
/// A file with no marker line at all is treated as one implicit dataset
/// covering the whole file, with an empty header.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    marker: Marker,
    header: String,
    spans: Vec<Span>,
    cache: Mutex<BTreeMap<usize, Arc<Dataset>>>,
}

impl LogFile {
    /// Index `path`, splitting it wherever `marker` matches a line.
    pub fn open(path: impl AsRef<Path>, marker: impl Into<Marker>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let marker = marker.into();

        let file = open_file(&path)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        let mut header_lines: Vec<String> = Vec::new();
        let mut spans: Vec<Span> = Vec::new();
        let mut offset = 0u64;
        let mut line_no = 0usize;

        loop {
            let n = next_line(&mut reader, &mut buf).map_err(|e| LogError::open(&path, e))?;
            if n == 0 {
                break;
            }
            let line = decode(&buf);
            offset += n as u64;

            if marker.matches(&line) {
                if let Some(prev) = spans.last_mut() {
                    prev.end_byte = offset - n as u64;
                    prev.end_line = line_no;
                }
                spans.push(Span {
                    marker_line: Some(line.into_owned()),
                    start_byte: offset,
                    end_byte: offset,
                    start_line: line_no + 1,
                    end_line: line_no + 1,
                });
            } else if spans.is_empty() {
                header_lines.push(line.into_owned());
            }
            line_no += 1;
        }

        if let Some(last) = spans.last_mut() {
            last.end_byte = offset;
            last.end_line = line_no;
        }

        let header = if spans.is_empty() {
            log::warn!("{}: no marker {marker} found, reading the whole file as one dataset", path.display());
            spans.push(Span {
                marker_line: None,
                start_byte: 0,
                end_byte: offset,
                start_line: 0,
                end_line: line_no,
            });
            String::new()
        } else {
            trim_blank_lines(&header_lines).join("\n")
        };

        log::info!(
            "{}: indexed {} dataset(s) over {line_no} lines",
            path.display(),
            spans.len()
        );

        Ok(LogFile {
            path,
            marker,
            header,
            spans,
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Number of datasets in the file.
    pub fn n_logs(&self) -> usize {
        self.spans.len()
    }

    /// Text above the first marker, blank lines at either end removed.
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Index of the dataset whose content covers `line` (0-based).
    pub fn dataset_containing(&self, line: usize) -> Option<usize> {
        self.spans
            .iter()
            .position(|s| (s.start_line..s.end_line).contains(&line))
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.cache_lock().contains_key(&index)
    }

    /// Extract dataset `index`, splitting data rows on `delimiter`.
    ///
    /// The first successful extraction of an index is cached and returned
    /// unchanged by every later call, whatever delimiter they pass.
    pub fn get_log(&self, index: usize, delimiter: &str) -> Result<Arc<Dataset>> {
        if let Some(ds) = self.cache_lock().get(&index) {
            if ds.delimiter != delimiter {
                log::warn!(
                    "dataset {index} was parsed with delimiter {:?}; ignoring {delimiter:?}",
                    ds.delimiter
                );
            }
            return Ok(Arc::clone(ds));
        }

        let span = self.spans.get(index).ok_or(LogError::IndexOutOfRange {
            index,
            n_logs: self.n_logs(),
        })?;
        let dataset = Arc::new(self.extract_span(index, span, delimiter)?);

        let mut cache = self.cache_lock();
        let cached = Arc::clone(cache.entry(index).or_insert(dataset));
        Ok(cached)
    }

    /// Extract every dataset in file order.
    pub fn get_all(&self, delimiter: &str) -> Result<Vec<Arc<Dataset>>> {
        (0..self.n_logs())
            .map(|i| self.get_log(i, delimiter))
            .collect()
    }

    /// Uncached extraction over lines `start..end` (0-based, end exclusive),
    /// ignoring dataset boundaries. Marker lines inside the range are skipped.
    pub fn read_lines(&self, start: usize, end: usize, delimiter: &str) -> Result<Dataset> {
        let file = open_file(&self.path)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        let source_index = self.dataset_containing(start).unwrap_or(0);
        let mut extractor = Extractor::new(source_index, delimiter);
        let mut line_no = 0usize;

        while line_no < end {
            let n = next_line(&mut reader, &mut buf).map_err(|e| LogError::io(&self.path, e))?;
            if n == 0 {
                break;
            }
            if line_no >= start {
                let line = decode(&buf);
                if self.marker.matches(&line) {
                    extractor.scan_timestamps(&line);
                } else {
                    extractor.push(line_no, &line);
                }
            }
            line_no += 1;
        }
        Ok(extractor.finish())
    }

    fn extract_span(&self, index: usize, span: &Span, delimiter: &str) -> Result<Dataset> {
        log::debug!(
            "extracting dataset {index} from lines {}..{} of {}",
            span.start_line,
            span.end_line,
            self.path.display()
        );
        let mut file = open_file(&self.path)?;
        file.seek(SeekFrom::Start(span.start_byte))
            .map_err(|e| LogError::io(&self.path, e))?;
        let mut reader = BufReader::new(file.take(span.end_byte - span.start_byte));
        let mut buf = Vec::new();

        let mut extractor = Extractor::new(index, delimiter);
        if let Some(marker_line) = &span.marker_line {
            extractor.scan_timestamps(marker_line);
        }

        let mut line_no = span.start_line;
        loop {
            let n = next_line(&mut reader, &mut buf).map_err(|e| LogError::io(&self.path, e))?;
            if n == 0 {
                break;
            }
            extractor.push(line_no, &decode(&buf));
            line_no += 1;
        }

        let dataset = extractor.finish();
        log::debug!(
            "dataset {index}: {} rows x {} cols, {} diagnostic(s)",
            dataset.n_rows(),
            dataset.n_cols(),
            dataset.diagnostics.len()
        );
        Ok(dataset)
    }

    fn cache_lock(&self) -> MutexGuard<'_, BTreeMap<usize, Arc<Dataset>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// -- File helpers --

fn open_file(path: &Path) -> Result<File> {
    let file = File::open(path).map_err(|e| LogError::open(path, e))?;
    let meta = file.metadata().map_err(|e| LogError::open(path, e))?;
    if meta.is_dir() {
        return Err(LogError::open(
            path,
            io::Error::new(io::ErrorKind::NotFound, "path is a directory"),
        ));
    }
    Ok(file)
}

/// Read one raw line (terminator included) into `buf`; returns bytes read.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf)
}

/// Lossy UTF-8 decode with the line terminator removed.
fn decode(buf: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(buf) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_end_matches(['\r', '\n'])),
        Cow::Owned(s) => Cow::Owned(s.trim_end_matches(['\r', '\n']).to_string()),
    }
}

fn trim_blank_lines(lines: &[String]) -> &[String] {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}
