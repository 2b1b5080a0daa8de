use serde::Serialize;
use serde_json::{json, Value};

use super::setup::import_settings;
use super::{conn, conn_mut, db_err, get_opt_bool, get_required_str};
use crate::import::{
    format_birthday, import_guardian, import_student, read_rows, run_batch, BatchOptions,
    GuardianRow, ImportRow, RowsError, StudentRow,
};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;

fn read_input(params: &Value) -> Result<String, HandlerErr> {
    if let Some(text) = params.get("csvText").and_then(|v| v.as_str()) {
        return Ok(text.to_string());
    }
    let in_path = get_required_str(params, "inPath")?;
    std::fs::read_to_string(&in_path).map_err(|e| {
        HandlerErr::new("parse_failed", e.to_string()).with_details(json!({ "path": in_path }))
    })
}

fn batch_options(state: &AppState, params: &Value) -> Result<BatchOptions, HandlerErr> {
    let settings = import_settings(conn(state)?)
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok(BatchOptions {
        dry_run: get_opt_bool(params, "dryRun")?.unwrap_or(settings.default_dry_run),
        atomic: get_opt_bool(params, "atomic")?.unwrap_or(settings.default_atomic),
        reimport_active: settings.reimport_active,
    })
}

fn parse_rows<R: ImportRow>(text: &str) -> Result<Vec<(u64, Result<R, String>)>, HandlerErr> {
    read_rows::<R>(text).map_err(|e| match e {
        RowsError::Csv(e) => HandlerErr::new("parse_failed", e.to_string()),
        e => HandlerErr::new("bad_columns", e.to_string())
            .with_details(json!({ "expected": R::COLUMNS })),
    })
}

fn to_result<T: Serialize>(v: &T) -> Result<Value, HandlerErr> {
    serde_json::to_value(v).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn import_guardians(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let opts = batch_options(state, params)?;
    let text = read_input(params)?;
    let rows = parse_rows::<GuardianRow>(&text)?;
    let report = run_batch(conn_mut(state)?, "guardian", rows, &opts, |store, row, o| {
        import_guardian(store, row, o).map(|out| (out.guardian.id, out.created))
    })
    .map_err(db_err("db_update_failed"))?;
    to_result(&report)
}

fn import_students(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let opts = batch_options(state, params)?;
    let text = read_input(params)?;
    let rows = parse_rows::<StudentRow>(&text)?;
    let report = run_batch(conn_mut(state)?, "student", rows, &opts, |store, row, o| {
        import_student(store, row, o).map(|out| (out.student.id, out.created))
    })
    .map_err(db_err("db_update_failed"))?;
    to_result(&report)
}

fn write_csv<R: ImportRow>(out_path: &str, rows: &[R]) -> Result<(), HandlerErr> {
    let io_err = |e: csv::Error| {
        HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": out_path }))
    };
    let mut wtr = csv::Writer::from_path(out_path).map_err(io_err)?;
    if rows.is_empty() {
        wtr.write_record(R::COLUMNS).map_err(io_err)?;
    }
    for r in rows {
        wtr.serialize(r).map_err(io_err)?;
    }
    wtr.flush()
        .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;
    Ok(())
}

fn export_guardians(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = get_required_str(params, "outPath")?;
    let rows = Store::new(conn(state)?)
        .export_guardians()
        .map_err(db_err("db_query_failed"))?
        .into_iter()
        .map(|g| GuardianRow {
            first_name: g.first_name,
            last_name: g.last_name,
            email: g.email,
            phone: g.phone,
            zip: g.zip,
        })
        .collect::<Vec<_>>();
    write_csv(&out_path, &rows)?;
    tracing::info!(path = %out_path, rows = rows.len(), "guardians exported");
    Ok(json!({ "path": out_path, "rowsExported": rows.len() }))
}

fn export_students(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = get_required_str(params, "outPath")?;
    let rows = Store::new(conn(state)?)
        .export_students()
        .map_err(db_err("db_query_failed"))?
        .into_iter()
        .map(|e| StudentRow {
            first_name: e.student.first_name,
            last_name: e.student.last_name,
            guardian_email: e.guardian_email,
            birthday: format_birthday(e.student.birthday),
            gender: e.student.gender,
            school_name: e.student.school_name,
            school_type: e.student.school_type,
            photo_release: e.student.photo_release.to_string(),
            consent: e.student.consent.to_string(),
        })
        .collect::<Vec<_>>();
    write_csv(&out_path, &rows)?;
    tracing::info!(path = %out_path, rows = rows.len(), "students exported");
    Ok(json!({ "path": out_path, "rowsExported": rows.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "guardians.import" => import_guardians(state, &req.params),
        "students.import" => import_students(state, &req.params),
        "guardians.export" => export_guardians(state, &req.params),
        "students.export" => export_students(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
