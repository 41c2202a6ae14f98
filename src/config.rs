//! Marker strategies, built-in log format presets and the JSON reader
//! configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

// ---------------------------------------------------------------------------
// Marker – how a dataset start is recognised
// ---------------------------------------------------------------------------

/// Recognises the line that opens a new dataset.
#[derive(Debug, Clone)]
pub enum Marker {
    /// Line contains this text anywhere.
    Substring(String),
    /// Line matches this regular expression.
    Pattern(Regex),
}

impl Marker {
    pub fn substring(text: impl Into<String>) -> Self {
        Marker::Substring(text.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Marker::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            Marker::Substring(s) => line.contains(s.as_str()),
            Marker::Pattern(re) => re.is_match(line),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Substring(s) => write!(f, "'{s}'"),
            Marker::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for Marker {
    fn from(text: &str) -> Self {
        Marker::substring(text)
    }
}

impl From<String> for Marker {
    fn from(text: String) -> Self {
        Marker::Substring(text)
    }
}

impl From<LogFormat> for Marker {
    fn from(format: LogFormat) -> Self {
        format.marker()
    }
}

// ---------------------------------------------------------------------------
// LogFormat – presets for the instruments we know about
// ---------------------------------------------------------------------------

/// Header styles of common logging tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// PuTTY session log (`=~=~=~ PuTTY log ... =~=~=~`).
    Putty,
    /// NI SignalExpress `.lvm` export.
    Lvm,
    /// NI SignalExpress sound pressure packets.
    LvmSpl,
    /// NI VirtualBench export; the first line names the bench.
    Nivb,
}

impl LogFormat {
    pub const ALL: [LogFormat; 4] = [
        LogFormat::Putty,
        LogFormat::Lvm,
        LogFormat::LvmSpl,
        LogFormat::Nivb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogFormat::Putty => "putty",
            LogFormat::Lvm => "lvm",
            LogFormat::LvmSpl => "lvmspl",
            LogFormat::Nivb => "nivb",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            // Anything but '=' or '~' may precede the banner on the same line.
            LogFormat::Putty => r"^[^=~]*=~",
            LogFormat::Lvm => r"^Test_Name",
            LogFormat::LvmSpl => r"^Packet_Notes",
            LogFormat::Nivb => r"NI\sVB-\d*",
        }
    }

    pub fn marker(self) -> Marker {
        // Presets are constant and covered by tests.
        Marker::Pattern(Regex::new(self.pattern()).expect("valid preset pattern"))
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        LogFormat::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| LogError::UnknownFormat {
                name: s.to_string(),
                expected: LogFormat::ALL.map(LogFormat::name).join(", "),
            })
    }
}

// ---------------------------------------------------------------------------
// ReaderConfig – JSON-loadable marker + delimiter
// ---------------------------------------------------------------------------

/// Serializable description of a [`Marker`].
///
/// ```json
/// { "format": "putty" }
/// { "substring": "RUN" }
/// { "pattern": "^Test \\d+" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSpec {
    Format(LogFormat),
    Substring(String),
    Pattern(String),
}

impl MarkerSpec {
    pub fn to_marker(&self) -> Result<Marker> {
        match self {
            MarkerSpec::Format(f) => Ok(f.marker()),
            MarkerSpec::Substring(s) => Ok(Marker::substring(s.clone())),
            MarkerSpec::Pattern(p) => Marker::pattern(p),
        }
    }
}

/// Everything needed to open a log and pull its datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    pub marker: MarkerSpec,
    /// Field delimiter for data rows. Empty means runs of whitespace.
    pub delimiter: String,
}

impl ReaderConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| LogError::open(path, e))?;
        Self::from_json(&text)
    }
}
