/// Data layer: line classification, dataset extraction and the file index.
///
/// Architecture:
/// ```text
///   interleaved .log / .lvm / .txt
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  one pass: marker lines → spans + header
///   └──────────┘
///        │  get_log(i, delim)
///        ▼
///   ┌──────────┐
///   │ extract   │  fold over the span: data rows | notes | label slot
///   └──────────┘
///        │  per line
///        ▼
///   ┌──────────┐
///   │ classify  │  Data(fields) or Text(raw)
///   └──────────┘
///        │
///        ▼
///     Dataset (cached per index)
/// ```

pub mod classify;
pub mod extract;
pub mod loader;
pub mod model;
