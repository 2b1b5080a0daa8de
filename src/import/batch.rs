use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::store::Store;

use super::rows::ParsedRow;
use super::{ImportError, ImportOptions, ReimportActive};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub dry_run: bool,
    /// Roll back every row when any row fails.
    pub atomic: bool,
    pub reimport_active: ReimportActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Created,
    Updated,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowReport {
    pub line: u64,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub dry_run: bool,
    pub atomic: bool,
    pub committed: bool,
    pub rows_total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub rows: Vec<RowReport>,
}

/// Runs `apply` over `rows` in input order, each row inside its own
/// savepoint so a failed row leaves no partial writes behind.
///
/// `apply` returns the target record id and whether it was newly created.
/// The whole run is rolled back on dry-run, and on any failure when atomic.
pub fn run_batch<R, F>(
    conn: &mut Connection,
    kind: &'static str,
    rows: Vec<ParsedRow<R>>,
    opts: &BatchOptions,
    mut apply: F,
) -> rusqlite::Result<BatchReport>
where
    F: FnMut(&Store<'_>, &R, &ImportOptions) -> Result<(String, bool), ImportError>,
{
    let row_opts = ImportOptions {
        dry_run: opts.dry_run,
        reimport_active: opts.reimport_active,
    };
    let mut report = BatchReport {
        dry_run: opts.dry_run,
        atomic: opts.atomic,
        committed: false,
        rows_total: rows.len(),
        created: 0,
        updated: 0,
        failed: 0,
        rows: Vec::with_capacity(rows.len()),
    };

    let mut tx = conn.transaction()?;
    for (line, parsed) in rows {
        let row = match parsed {
            Ok(r) => r,
            Err(message) => {
                warn!(kind, line, error = %message, "import row unreadable");
                report.failed += 1;
                report.rows.push(RowReport {
                    line,
                    status: RowStatus::Failed,
                    id: None,
                    code: Some("bad_row"),
                    message: Some(message),
                });
                continue;
            }
        };

        let sp = tx.savepoint()?;
        let result = apply(&Store::new(&sp), &row, &row_opts);
        match result {
            Ok((id, created)) => {
                sp.commit()?;
                let status = if created {
                    report.created += 1;
                    RowStatus::Created
                } else {
                    report.updated += 1;
                    RowStatus::Updated
                };
                info!(kind, line, id = %id, ?status, dry_run = opts.dry_run, "import row applied");
                report.rows.push(RowReport {
                    line,
                    status,
                    id: Some(id),
                    code: None,
                    message: None,
                });
            }
            Err(e) => {
                // Default drop behaviour rolls this row back.
                sp.finish()?;
                if let ImportError::Db(_) = e {
                    warn!(kind, line, error = %e, "import row hit a database error");
                } else {
                    info!(kind, line, code = e.code(), error = %e, "import row rejected");
                }
                report.failed += 1;
                report.rows.push(RowReport {
                    line,
                    status: RowStatus::Failed,
                    id: None,
                    code: Some(e.code()),
                    message: Some(e.to_string()),
                });
            }
        }
    }

    if opts.dry_run || (opts.atomic && report.failed > 0) {
        tx.rollback()?;
    } else {
        tx.commit()?;
        report.committed = true;
    }
    info!(
        kind,
        rows = report.rows_total,
        created = report.created,
        updated = report.updated,
        failed = report.failed,
        committed = report.committed,
        "import batch finished"
    );
    Ok(report)
}
