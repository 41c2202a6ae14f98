// ---------------------------------------------------------------------------
// ClassifiedLine – the verdict for a single raw line
// ---------------------------------------------------------------------------

/// A line of a dataset span after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedLine {
    /// Every field parsed as a finite number.
    Data(Vec<f64>),
    /// Anything else, kept verbatim (line terminator removed).
    Text(String),
}

impl ClassifiedLine {
    pub fn is_data(&self) -> bool {
        matches!(self, ClassifiedLine::Data(_))
    }
}

// ---------------------------------------------------------------------------
// Splitting and parsing
// ---------------------------------------------------------------------------

/// Split `line` on `delimiter`, trim each piece and drop the empty ones.
///
/// An empty delimiter splits on runs of whitespace.
pub fn fields<'a>(line: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        return line.split_whitespace().collect();
    }
    line.split(delimiter)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

/// Total number parse: `Some` only for finite reals.
///
/// Accepts an optional sign, a decimal point and an exponent. `nan` and
/// `inf` spellings are rejected even though `f64::from_str` takes them.
pub fn parse_number(field: &str) -> Option<f64> {
    let field = field.trim();
    let looks_numeric = field
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decide whether `line` is a numeric data row.
pub fn classify(line: &str, delimiter: &str) -> ClassifiedLine {
    let line = line.trim_end_matches(['\r', '\n']);
    let parts = fields(line, delimiter);
    if parts.is_empty() {
        return ClassifiedLine::Text(line.to_string());
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in parts {
        match parse_number(part) {
            Some(v) => values.push(v),
            None => return ClassifiedLine::Text(line.to_string()),
        }
    }
    ClassifiedLine::Data(values)
}
