use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A spreadsheet row shape with a fixed column set.
pub trait ImportRow: DeserializeOwned + Serialize {
    const COLUMNS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub zip: String,
}

impl ImportRow for GuardianRow {
    const COLUMNS: &'static [&'static str] = &["first_name", "last_name", "email", "phone", "zip"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRow {
    pub first_name: String,
    pub last_name: String,
    pub guardian_email: String,
    pub birthday: String,
    pub gender: String,
    pub school_name: String,
    pub school_type: String,
    pub photo_release: String,
    pub consent: String,
}

impl ImportRow for StudentRow {
    const COLUMNS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "guardian_email",
        "birthday",
        "gender",
        "school_name",
        "school_type",
        "photo_release",
        "consent",
    ];
}

#[derive(Debug, Error)]
pub enum RowsError {
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("unknown columns: {}", .0.join(", "))]
    UnknownColumns(Vec<String>),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("unreadable csv: {0}")]
    Csv(#[from] csv::Error),
}

/// One data line: its 1-based line number and the typed row, or why the
/// line could not be deserialized.
pub type ParsedRow<R> = (u64, Result<R, String>);

/// Validates the header against `R::COLUMNS`, then deserializes each record.
/// Column order is free and header names are matched case-insensitively.
pub fn read_rows<R: ImportRow>(text: &str) -> Result<Vec<ParsedRow<R>>, RowsError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let header = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect::<Vec<_>>();
    check_columns(&header, R::COLUMNS)?;
    let header = StringRecord::from(header);

    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = rec.position().map(|p| p.line()).unwrap_or(0);
        if rec.len() != header.len() {
            let msg = format!("expected {} fields, found {}", header.len(), rec.len());
            out.push((line, Err(msg)));
            continue;
        }
        out.push((
            line,
            rec.deserialize::<R>(Some(&header)).map_err(|e| e.to_string()),
        ));
    }
    Ok(out)
}

fn check_columns(header: &[String], expected: &[&str]) -> Result<(), RowsError> {
    let mut seen = std::collections::HashSet::new();
    for h in header {
        if !seen.insert(h.as_str()) {
            return Err(RowsError::DuplicateColumn(h.clone()));
        }
    }
    let missing = expected
        .iter()
        .filter(|c| !seen.contains(**c))
        .map(|c| c.to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(RowsError::MissingColumns(missing));
    }
    let unknown = header
        .iter()
        .filter(|h| !expected.contains(&h.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(RowsError::UnknownColumns(unknown));
    }
    Ok(())
}
