use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;

use crate::errors::CsvError;
use crate::scoring::{Category, Check, TestResult};

pub const CSV_HEADER: &str = "module,category,hasSecretFile,pageRenders,getAll,getById,create,update,delete,validation,invalidId,negativePrice,xssPrevention,tsStrictness,totalScore,timestamp";

/// Check columns in header order (between `category` and `totalScore`).
const CHECK_COLUMNS: [Check; 12] = [
    Check::SecretFile,
    Check::PageRenders,
    Check::GetAll,
    Check::GetById,
    Check::Create,
    Check::Update,
    Check::Delete,
    Check::Validation,
    Check::InvalidId,
    Check::NegativePrice,
    Check::XssPrevention,
    Check::TsStrictness,
];

const FIELD_COUNT: usize = CHECK_COLUMNS.len() + 4;

/// Quote a field only when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn format_row(result: &TestResult) -> String {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    fields.push(escape_field(&result.module));
    fields.push(result.category.to_string());
    fields.extend(CHECK_COLUMNS.iter().map(|c| result.passed(*c).to_string()));
    fields.push(result.total_score().to_string());
    fields.push(result.timestamp_iso());
    fields.join(",")
}

/// Header plus one row per result, newline separated.
pub fn format_csv(results: &[TestResult]) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(results.iter().map(format_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write results to `path`, replacing any previous file.
///
/// Uses atomic-write-file so a crash never leaves a half-written leaderboard.
/// Creates the parent directory if needed.
pub fn write_csv(path: &Path, results: &[TestResult]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create results directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(format_csv(results).as_bytes())
        .context("Failed to write results")?;
    file.commit().context("Failed to save results")?;

    Ok(())
}

pub fn read_csv(path: &Path) -> Result<Vec<TestResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file at {}", path.display()))?;
    parse_csv(&content).with_context(|| format!("Invalid results file {}", path.display()))
}

/// Split CSV text into records, honouring quoted fields.
/// Returns each record with the 1-based line it starts on.
fn split_records(content: &str) -> Result<Vec<(usize, Vec<String>)>, CsvError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                if !(fields.len() == 1 && fields[0].is_empty()) {
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                fields.clear();
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::Unterminated { line: record_line });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }

    Ok(records)
}

fn parse_bool(line: usize, column: &str, value: &str) -> Result<bool, CsvError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CsvError::Value {
            line,
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a results CSV produced by [`format_csv`].
///
/// Rejects rows whose `totalScore` disagrees with their check columns.
pub fn parse_csv(content: &str) -> Result<Vec<TestResult>, CsvError> {
    let mut records = split_records(content)?.into_iter();

    let (_, header) = records.next().ok_or(CsvError::Empty)?;
    let header = header.join(",");
    if header.trim_start_matches('\u{feff}') != CSV_HEADER {
        return Err(CsvError::Header(header));
    }

    records
        .map(|(line, fields)| parse_record(line, &fields))
        .collect()
}

fn parse_record(line: usize, fields: &[String]) -> Result<TestResult, CsvError> {
    if fields.len() != FIELD_COUNT {
        return Err(CsvError::FieldCount {
            line,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let value_error = |column: &str, value: &str| CsvError::Value {
        line,
        column: column.to_string(),
        value: value.to_string(),
    };

    let category: Category = fields[1]
        .parse()
        .map_err(|_| value_error("category", &fields[1]))?;

    let timestamp = DateTime::parse_from_rfc3339(&fields[FIELD_COUNT - 1])
        .map_err(|_| value_error("timestamp", &fields[FIELD_COUNT - 1]))?
        .with_timezone(&Utc);

    let mut result = TestResult::with_timestamp(category, fields[0].clone(), timestamp);
    for (check, value) in CHECK_COLUMNS.iter().zip(&fields[2..]) {
        result.record(*check, parse_bool(line, check.column(), value)?);
    }

    let stored: u32 = fields[FIELD_COUNT - 2]
        .parse()
        .map_err(|_| value_error("totalScore", &fields[FIELD_COUNT - 2]))?;
    let computed = result.total_score();
    if stored != computed {
        return Err(CsvError::ScoreMismatch {
            line,
            stored,
            computed,
        });
    }

    Ok(result)
}
