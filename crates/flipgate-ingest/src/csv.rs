use crate::{IngestError, parse_timestamp, read_file};
use flipgate_types::{OutcomeRecord, TestStatus};
use std::path::Path;

const TIMESTAMP: &str = "timestamp";
const TEST_IDENTIFIER: &str = "test_identifier";
const TEST_STATUS: &str = "test_status";

#[derive(Debug)]
struct CsvRecord {
    line: usize,
    fields: Vec<String>,
}

fn push_record(records: &mut Vec<CsvRecord>, line: usize, fields: Vec<String>) {
    // Blank line.
    if fields.len() == 1 && fields[0].trim().is_empty() {
        return;
    }
    records.push(CsvRecord { line, fields });
}

/// RFC 4180 record splitter: quoted fields may hold commas, newlines and
/// doubled quotes.
fn split_records(input: &str) -> Result<Vec<CsvRecord>, IngestError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = input.chars().peekable();
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
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(IngestError::Csv {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut records, record_line, fields);
    }
    Ok(records)
}

fn column(header: &[String], name: &'static str) -> Result<usize, IngestError> {
    header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or(IngestError::MissingColumn(name))
}

/// Parse a history CSV. Extra columns are ignored; rows keep file order.
pub fn parse_history_csv(input: &str) -> Result<Vec<OutcomeRecord>, IngestError> {
    let mut records = split_records(input)?.into_iter();
    let Some(header) = records.next() else {
        return Err(IngestError::Csv {
            line: 1,
            message: "missing header row".to_string(),
        });
    };

    let ts_idx = column(&header.fields, TIMESTAMP)?;
    let id_idx = column(&header.fields, TEST_IDENTIFIER)?;
    let status_idx = column(&header.fields, TEST_STATUS)?;
    let needed = ts_idx.max(id_idx).max(status_idx) + 1;

    let mut out = Vec::new();
    for record in records {
        if record.fields.len() < needed {
            return Err(IngestError::Csv {
                line: record.line,
                message: format!(
                    "expected at least {needed} fields, found {}",
                    record.fields.len()
                ),
            });
        }
        let raw_ts = &record.fields[ts_idx];
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| IngestError::InvalidTimestamp {
            line: record.line,
            value: raw_ts.clone(),
        })?;
        out.push(OutcomeRecord::new(
            timestamp,
            record.fields[id_idx].as_str(),
            TestStatus::parse(&record.fields[status_idx]),
        ));
    }
    Ok(out)
}

pub fn read_history_csv(path: &Path) -> Result<Vec<OutcomeRecord>, IngestError> {
    let content = read_file(path)?;
    let records = parse_history_csv(&content)?;
    tracing::debug!(path = %path.display(), records = records.len(), "parsed history csv");
    Ok(records)
}
