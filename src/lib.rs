//! Pull numeric datasets out of logs that mix data with everything else.
//!
//! Terminal captures and instrument exports interleave data rows with
//! commands, banners and operator notes. [`LogFile`] indexes such a file by
//! a marker line, then extracts each dataset on demand, separating the
//! numeric matrix from the surrounding text.
//!
//! ```no_run
//! use rusty_logbook::{LogFile, LogFormat};
//!
//! let log = LogFile::open("bench.log", LogFormat::Putty)?;
//! println!("{} runs", log.n_logs());
//! let run = log.get_log(0, ",")?;
//! println!("{:?} {}x{}", run.labels, run.n_rows(), run.n_cols());
//! # Ok::<(), rusty_logbook::LogError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod report;

pub use config::{LogFormat, Marker, MarkerSpec, ReaderConfig};
pub use data::classify::{classify, ClassifiedLine};
pub use data::loader::{LogFile, Span};
pub use data::model::{Dataset, Diagnostic, MISSING};
pub use error::{LogError, Result};
