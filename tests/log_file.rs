//! Integration tests: indexing and extracting datasets from files on disk.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusty_logbook::{Diagnostic, LogError, LogFile, LogFormat, Marker};
use tempfile::TempDir;

/// Write `contents` into a fresh temp dir and return (dir, path).
fn fixture(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("capture.log");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

fn open(path: &Path, marker: &str) -> LogFile {
    LogFile::open(path, marker).unwrap()
}

const TWO_RUNS: &str = "\
Bench rig 4
operator notes

RUN1 2021/06/01 10:00:00
start test
1,2,3
user pressed stop
4,5,6
RUN2 2021/06/01 11:30:15
Time,Pressure
0.1,1.0
0.2,2.0
";

#[test]
fn header_and_segmentation() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");

    assert_eq!(log.n_logs(), 2);
    assert_eq!(log.header(), "Bench rig 4\noperator notes");

    let spans = log.spans();
    assert_eq!((spans[0].start_line, spans[0].end_line), (4, 8));
    assert_eq!((spans[1].start_line, spans[1].end_line), (9, 12));
    assert!(spans[0].start_byte < spans[1].start_byte);
    assert_eq!(log.dataset_containing(5), Some(0));
    assert_eq!(log.dataset_containing(8), None);
}

#[test]
fn interrupted_run() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");

    let run = log.get_log(0, ",").unwrap();
    assert_eq!(run.source_index, 0);
    assert_eq!(run.data, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    assert_eq!(run.notes, "start test\nuser pressed stop");
    assert_eq!(run.labels, None);
    assert_eq!(run.date.as_deref(), Some("2021/06/01"));
    assert_eq!(run.start_time.as_deref(), Some("10:00:00"));
}

#[test]
fn labelled_run() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");

    let run = log.get_log(1, ",").unwrap();
    assert_eq!(run.labels, Some(vec!["Time".to_string(), "Pressure".to_string()]));
    assert_eq!(run.data, vec![vec![0.1, 1.0], vec![0.2, 2.0]]);
    assert_eq!(run.notes, "");
    assert_eq!(run.column_by_name("Pressure"), Some(vec![1.0, 2.0]));
}

#[test]
fn refetch_is_identical_and_cached() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");

    assert!(!log.is_cached(1));
    let first = log.get_log(1, ",").unwrap();
    assert!(log.is_cached(1));
    let again = log.get_log(1, ",").unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    // A different delimiter does not re-parse a cached dataset.
    let other = log.get_log(1, ";").unwrap();
    assert_eq!(other.delimiter, ",");
    assert_eq!(other.data, first.data);
}

#[test]
fn cached_result_survives_file_change() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");
    let before = log.get_log(0, ",").unwrap();

    std::fs::write(&path, "overwritten\n").unwrap();
    let after = log.get_log(0, ",").unwrap();
    assert_eq!(before.notes, after.notes);
    assert_eq!(before.data, after.data);
}

#[test]
fn unknown_index() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");
    match log.get_log(log.n_logs(), ",") {
        Err(LogError::IndexOutOfRange { index, n_logs }) => {
            assert_eq!((index, n_logs), (2, 2));
        }
        other => panic!("expected IndexOutOfRange, got {other:?}"),
    }
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = LogFile::open(dir.path().join("nope.log"), Marker::substring("RUN")).unwrap_err();
    assert!(matches!(err, LogError::NotFound { .. }), "{err:?}");

    let err = LogFile::open(dir.path(), Marker::substring("RUN")).unwrap_err();
    assert!(matches!(err, LogError::NotFound { .. }), "{err:?}");
}

#[test]
fn ragged_rows_are_padded() {
    let (_dir, path) = fixture("RUN1\n1,2,3\n4,5,6\n7,8\n9,10,11\n");
    let log = open(&path, "RUN");
    let run = log.get_log(0, ",").unwrap();

    assert_eq!(run.n_rows(), 4);
    assert_eq!(run.n_cols(), 3);
    assert!(run.data[2][2].is_nan());
    assert_eq!(run.data[3], vec![9.0, 10.0, 11.0]);
    assert_eq!(
        run.diagnostics,
        vec![Diagnostic::InconsistentRowWidth {
            row: 2,
            line: 3,
            expected: 3,
            found: 2,
        }]
    );
}

#[test]
fn one_long_row_among_regular_rows() {
    let (_dir, path) = fixture("RUN1\nt,v\n1,2\n3,4,5\n6,7\n8,9\n10,11\n");
    let log = LogFile::open(&path, String::from("RUN1")).unwrap();
    let run = log.get_log(0, ",").unwrap();

    assert_eq!(run.n_cols(), 2);
    assert_eq!(run.labels, Some(vec!["t".to_string(), "v".to_string()]));
    assert_eq!(run.data[1], vec![3.0, 4.0]);
    assert_eq!(
        run.diagnostics,
        vec![Diagnostic::InconsistentRowWidth {
            row: 1,
            line: 3,
            expected: 2,
            found: 3,
        }]
    );
}

#[test]
fn no_markers_means_one_implicit_dataset() {
    let (_dir, path) = fixture("some banner\nx y\n1 2\n3 4\n");
    let log = open(&path, "RUN");

    assert_eq!(log.n_logs(), 1);
    assert_eq!(log.header(), "");
    assert_eq!(log.spans()[0].marker_line, None);

    let run = log.get_log(0, " ").unwrap();
    assert_eq!(run.notes, "some banner");
    assert_eq!(run.labels, Some(vec!["x".to_string(), "y".to_string()]));
    assert_eq!(run.n_rows(), 2);
}

#[test]
fn empty_file() {
    let (_dir, path) = fixture("");
    let log = open(&path, "RUN");
    assert_eq!(log.n_logs(), 1);
    let run = log.get_log(0, ",").unwrap();
    assert!(run.is_empty());
    assert_eq!(run.notes, "");
}

#[test]
fn marker_on_last_line_gives_empty_dataset() {
    let (_dir, path) = fixture("hdr\nRUN1\n1,2\nRUN2\n");
    let log = open(&path, "RUN");
    assert_eq!(log.n_logs(), 2);
    let last = log.get_log(1, ",").unwrap();
    assert!(last.is_empty());
    assert_eq!(last.notes, "");
}

#[test]
fn crlf_and_whitespace_delimiter() {
    let (_dir, path) = fixture("RUN\r\nTime  Pressure\r\n0.1   1.0\r\n0.2\t2.0\r\n");
    let log = open(&path, "RUN");
    let run = log.get_log(0, "").unwrap();
    assert_eq!(run.labels, Some(vec!["Time".to_string(), "Pressure".to_string()]));
    assert_eq!(run.data, vec![vec![0.1, 1.0], vec![0.2, 2.0]]);
}

#[test]
fn putty_preset() {
    let capture = "\
=~=~=~=~=~=~=~=~=~=~=~= PuTTY log 2021.03.01 09:15:02 =~=~=~=~=~=~=~=~=~=~=~=
> start
t,v
0,1
1,2
=~=~=~=~=~=~=~=~=~=~=~= PuTTY log 2021.03.01 09:20:40 =~=~=~=~=~=~=~=~=~=~=~=
> start
0,5
";
    let (_dir, path) = fixture(capture);
    let log = LogFile::open(&path, LogFormat::Putty).unwrap();
    assert_eq!(log.n_logs(), 2);
    assert_eq!(log.header(), "");

    let first = log.get_log(0, ",").unwrap();
    assert_eq!(first.notes, "> start");
    assert_eq!(first.labels, Some(vec!["t".to_string(), "v".to_string()]));
    assert_eq!(first.date.as_deref(), Some("2021.03.01"));

    let second = log.get_log(1, ",").unwrap();
    assert_eq!(second.start_time.as_deref(), Some("09:20:40"));
    assert_eq!(second.data, vec![vec![0.0, 5.0]]);
}

#[test]
fn lvm_preset_with_tabs() {
    let export = "LabVIEW Measurement\nWriter_Version\t2\n\nTest_Name\tsweep A\nX_Value\tVoltage\n0\t1.5\n1\t1.7\nTest_Name\tsweep B\nX_Value\tVoltage\n0\t2.5\n";
    let (_dir, path) = fixture(export);
    let log = LogFile::open(&path, LogFormat::Lvm).unwrap();
    assert_eq!(log.n_logs(), 2);
    assert_eq!(log.header(), "LabVIEW Measurement\nWriter_Version\t2");

    let b = log.get_log(1, "\t").unwrap();
    assert_eq!(b.labels, Some(vec!["X_Value".to_string(), "Voltage".to_string()]));
    assert_eq!(b.data, vec![vec![0.0, 2.5]]);
}

#[test]
fn read_lines_ignores_boundaries() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");

    // From the second data row of run 1 into run 2.
    let range = log.read_lines(7, 11, ",").unwrap();
    assert_eq!(range.source_index, 0);
    assert_eq!(range.n_rows(), 2);
    assert_eq!(range.data[0], vec![4.0, 5.0, 6.0]);
    assert_eq!(&range.data[1][..2], &[0.1, 1.0]);
    assert_eq!(range.diagnostics.len(), 1);
    assert_eq!(range.notes, "Time,Pressure");
    assert_eq!(range.start_time.as_deref(), Some("11:30:15"));
    assert!(!log.is_cached(0));
}

#[test]
fn regex_marker() {
    let (_dir, path) = fixture("a\nTest 1\n1\nnot a Test\n2\nTest 2\n3\n");
    let log = LogFile::open(&path, Marker::pattern(r"^Test \d+$").unwrap()).unwrap();
    assert_eq!(log.n_logs(), 2);
    let first = log.get_log(0, ",").unwrap();
    assert_eq!(first.notes, "not a Test");
    assert_eq!(first.data, vec![vec![1.0], vec![2.0]]);
}

#[test]
fn shared_across_threads() {
    let (_dir, path) = fixture(TWO_RUNS);
    let log = open(&path, "RUN");

    let results: Vec<Arc<rusty_logbook::Dataset>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| log.get_log(1, ",").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}
