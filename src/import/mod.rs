//! Spreadsheet import of guardians and students.

mod batch;
mod guardian;
mod normalize;
mod resolve;
mod rows;
mod student;

pub use batch::{run_batch, BatchOptions};
pub use guardian::{import_guardian, ReimportActive};
pub use normalize::format_birthday;
pub use rows::{read_rows, GuardianRow, ImportRow, RowsError, StudentRow};
pub use student::import_student;

use thiserror::Error;

/// Why a single row could not be imported. Every variant is row-fatal.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("guardian with email {email} not found")]
    GuardianNotFound { email: String },
    #[error("birthday {value:?} is not a MM/DD/YYYY date")]
    InvalidDate { value: String },
    #[error("account {email} exists but has no guardian record")]
    InconsistentData { email: String },
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("more than one student named {first_name} {last_name}")]
    Ambiguous {
        first_name: String,
        last_name: String,
    },
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::GuardianNotFound { .. } => "guardian_not_found",
            ImportError::InvalidDate { .. } => "invalid_date",
            ImportError::InconsistentData { .. } => "inconsistent_data",
            ImportError::MissingField(_) => "missing_field",
            ImportError::Ambiguous { .. } => "ambiguous_match",
            ImportError::Db(_) => "db_error",
        }
    }
}

/// Per-run switches shared by every row of a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub reimport_active: ReimportActive,
}
