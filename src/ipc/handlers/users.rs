use serde_json::{json, Value};
use uuid::Uuid;

use super::{conn, db_err, get_required_str};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{Account, Store};

const ROLES: &[&str] = &["", "mentor", "guardian"];

fn opt_trimmed(params: &Value, key: &str) -> String {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn create_user(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = conn(state)?;
    let email = get_required_str(params, "email")?;
    let role = opt_trimmed(params, "role").to_ascii_lowercase();
    if !ROLES.contains(&role.as_str()) {
        return Err(HandlerErr::bad_params("role must be one of: mentor, guardian"));
    }
    let username = match opt_trimmed(params, "username") {
        u if u.is_empty() => email.clone(),
        u => u,
    };

    let store = Store::new(conn);
    if let Some(existing) = store
        .find_account_by_email(&email)
        .map_err(db_err("db_query_failed"))?
    {
        return Err(HandlerErr::new("conflict", "an account with that email exists")
            .with_details(json!({ "userId": existing.id })));
    }

    let account = Account {
        id: Uuid::new_v4().to_string(),
        email,
        username,
        first_name: opt_trimmed(params, "firstName"),
        last_name: opt_trimmed(params, "lastName"),
        role,
    };
    store.save_account(&account).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            HandlerErr::new("conflict", "username already taken")
        }
        e => HandlerErr::new("db_insert_failed", e.to_string()),
    })?;
    tracing::info!(user_id = %account.id, role = %account.role, "user created");

    Ok(json!({
        "userId": account.id,
        "email": account.email,
        "username": account.username,
        "role": account.role
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "users.create" => Some(respond(&req.id, create_user(state, &req.params))),
        _ => None,
    }
}
