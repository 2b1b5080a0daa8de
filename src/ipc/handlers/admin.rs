use serde_json::{json, Value};

use super::{conn, get_required_str};
use crate::admin::changelist::{self, ChangelistError, Query};
use crate::admin::{lookup, registry, ModelAdmin};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn model_param(params: &Value) -> Result<&'static ModelAdmin, HandlerErr> {
    let key = get_required_str(params, "model")?;
    lookup(&key).ok_or_else(|| {
        HandlerErr::new("not_found", format!("model {} is not registered", key))
    })
}

fn parse_query(params: &Value) -> Result<Query, HandlerErr> {
    let q = params
        .get("q")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let filters = match params.get("filters") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(obj)) => obj
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Some(_) => return Err(HandlerErr::bad_params("filters must be object")),
    };

    let ordering = match params.get("ordering") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| HandlerErr::bad_params("ordering entries must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(HandlerErr::bad_params("ordering must be string or array")),
    };

    let int = |key: &str| -> Result<i64, HandlerErr> {
        match params.get(key) {
            None | Some(Value::Null) => Ok(0),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| HandlerErr::bad_params(format!("{} must be integer", key))),
        }
    };

    Ok(Query {
        q,
        filters,
        ordering,
        page: int("page")?,
        per_page: int("perPage")?,
    })
}

fn handle_changelist(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = conn(state)?;
    let admin = model_param(params)?;
    let query = parse_query(params)?;
    let page = changelist::query(conn, admin, &query).map_err(|e| match e {
        ChangelistError::NoStorage(_) => HandlerErr::new("no_storage", e.to_string()),
        ChangelistError::Db(e) => HandlerErr::new("db_query_failed", e.to_string()),
        e => HandlerErr::bad_params(e.to_string()),
    })?;
    Ok(json!({
        "model": admin.key,
        "columns": admin.list_display,
        "total": page.total,
        "page": page.page,
        "perPage": page.per_page,
        "rows": page.rows
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "admin.registry" => Ok(json!({ "models": registry() })),
        "admin.model" => model_param(&req.params).map(|m| json!(m)),
        "admin.changelist" => handle_changelist(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
