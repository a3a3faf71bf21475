//! Result sinks: the CSV ledger and the output image collection.
//!
//! Ledger format: a `file_name,has_vehicle` header line, then one row per
//! enumerated file in enumeration order with `true`/`false` tokens. Fields
//! holding a comma, quote or line break are quoted with doubled quotes.
//! Every row is flushed as soon as it is written, so a stopped batch leaves
//! a well-formed file containing exactly the rows written so far.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::models::{BatchSummary, DetectionResult, ImageRecord, SummaryRow};

pub const HEADER: [&str; 2] = ["file_name", "has_vehicle"];

/// Receives each image's result exactly once, in enumeration order
pub trait ResultSink {
    /// Persist one result; `source` is the image file it came from.
    fn record(&mut self, result: &DetectionResult, source: &Path) -> Result<(), SinkError>;

    /// Flush and close.
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Writes the CSV ledger and copies vehicle images to the output directory
pub struct CsvResultSink {
    writer: BufWriter<File>,
    summary_path: PathBuf,
    output_dir: PathBuf,
}

impl CsvResultSink {
    /// Create (or truncate) the ledger and make sure the output directory exists.
    pub fn create(summary_path: &Path, output_dir: &Path) -> Result<Self, SinkError> {
        let open_err = |source| SinkError::Open {
            path: summary_path.to_path_buf(),
            source,
        };

        if let Some(parent) = summary_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        std::fs::create_dir_all(output_dir).map_err(|source| SinkError::Open {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let file = File::create(summary_path).map_err(open_err)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", HEADER.join(","))
            .and_then(|_| writer.flush())
            .map_err(open_err)?;

        Ok(Self {
            writer,
            summary_path: summary_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        })
    }
}

impl ResultSink for CsvResultSink {
    fn record(&mut self, result: &DetectionResult, source: &Path) -> Result<(), SinkError> {
        if result.has_vehicle {
            let target = self.output_dir.join(&result.file_name);
            if same_file(source, &target) {
                // Copying a file onto itself truncates it
                tracing::debug!(target = %target.display(), "vehicle image already in output directory");
            } else {
                std::fs::copy(source, &target).map_err(|source| SinkError::Copy {
                    file_name: result.file_name.clone(),
                    source,
                })?;
                tracing::debug!(target = %target.display(), "copied vehicle image");
            }
        }

        writeln!(
            self.writer,
            "{},{}",
            escape_field(&result.file_name),
            result.has_vehicle
        )
        .and_then(|_| self.writer.flush())
        .map_err(|source| SinkError::Write {
            file_name: result.file_name.clone(),
            source,
        })
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(|source| SinkError::Open {
            path: self.summary_path.clone(),
            source,
        })
    }
}

/// Keeps results in memory; for adapters that render results themselves
#[derive(Debug, Default)]
pub struct MemorySink {
    pub results: Vec<DetectionResult>,
}

impl ResultSink for MemorySink {
    fn record(&mut self, result: &DetectionResult, _source: &Path) -> Result<(), SinkError> {
        self.results.push(result.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV text into records, honoring quoted fields.
fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => record.push(std::mem::take(&mut field)),
            ('\r', false) => {}
            ('\n', false) => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            (c, _) => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Read a ledger written by `CsvResultSink`.
pub fn read_summary(path: &Path) -> Result<BatchSummary, SinkError> {
    let read_err = |reason: String| SinkError::Read {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| read_err(e.to_string()))?;

    let mut rows = Vec::new();
    for (line, record) in parse_records(&content).into_iter().enumerate() {
        if line == 0 && record == HEADER {
            continue;
        }
        let [file_name, flag] = <[String; 2]>::try_from(record)
            .map_err(|r| read_err(format!("row {} has {} fields", line + 1, r.len())))?;
        let has_vehicle = match flag.trim() {
            "true" | "True" => true,
            "false" | "False" => false,
            other => return Err(read_err(format!("row {}: bad flag '{}'", line + 1, other))),
        };
        rows.push(SummaryRow {
            file_name,
            has_vehicle,
        });
    }
    Ok(rows)
}

/// Records of every vehicle image in the ledger that still exists in `input_dir`.
pub fn vehicle_records(summary_path: &Path, input_dir: &Path) -> Result<Vec<ImageRecord>, SinkError> {
    let mut records = Vec::new();
    for row in read_summary(summary_path)?.into_iter().filter(|r| r.has_vehicle) {
        let path = input_dir.join(&row.file_name);
        match image::image_dimensions(&path) {
            Ok((width, height)) => {
                let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                records.push(ImageRecord {
                    path,
                    width,
                    height,
                    size_bytes,
                });
            }
            Err(e) => tracing::warn!(file = %row.file_name, error = %e, "listed image is unavailable"),
        }
    }
    Ok(records)
}
