use chrono::NaiveDate;

use super::ImportError;

const BIRTHDAY_FORMAT: &str = "%m/%d/%Y";

/// Spreadsheet yes/no cells. Blank and unrecognised text read as `false`.
pub fn parse_boolish(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y" | "on"
    )
}

/// Month-first date with a four-digit year. Month and day may be unpadded.
pub fn parse_birthday(s: &str) -> Result<NaiveDate, ImportError> {
    let invalid = || ImportError::InvalidDate {
        value: s.to_string(),
    };
    let v = s.trim();
    // chrono's %Y takes a sign and any number of digits.
    match v.rsplit_once('/') {
        Some((_, year)) if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) => {}
        _ => return Err(invalid()),
    }
    NaiveDate::parse_from_str(v, BIRTHDAY_FORMAT).map_err(|_| invalid())
}

pub fn format_birthday(d: NaiveDate) -> String {
    d.format(BIRTHDAY_FORMAT).to_string()
}

pub(crate) fn clean_text(s: &str) -> String {
    s.trim().to_string()
}
