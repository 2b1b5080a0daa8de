//! Compiles a changelist request (search, filters, ordering, paging) into SQL
//! for the entities stored in the workspace.
//!
//! Field names are the admin's names (`get_first_name`, `user__username`,
//! `guardian`) and only resolve through the per-model tables below, so no
//! caller text reaches the SQL except as bound parameters.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde_json::{json, Map};
use thiserror::Error;

use super::ModelAdmin;

pub const DEFAULT_PER_PAGE: i64 = 100;
pub const MAX_PER_PAGE: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Int,
    Bool,
    /// ISO-8601 text; filters match on a prefix (`2024`, `2024-05`, ...).
    Timestamp,
}

struct Source {
    id: &'static str,
    from: &'static str,
    fields: &'static [(&'static str, &'static str, Kind)],
}

const USER: Source = Source {
    id: "u.id",
    from: "users u",
    fields: &[
        ("email", "u.email", Kind::Text),
        ("first_name", "u.first_name", Kind::Text),
        ("last_name", "u.last_name", Kind::Text),
        ("role", "u.role", Kind::Text),
        ("date_joined", "u.date_joined", Kind::Timestamp),
        ("last_login", "u.last_login", Kind::Timestamp),
        ("is_active", "u.is_active", Kind::Bool),
        ("is_staff", "u.is_staff", Kind::Bool),
        ("is_superuser", "u.is_superuser", Kind::Bool),
    ],
};

const GUARDIAN: Source = Source {
    id: "g.id",
    from: "guardians g
           JOIN users u ON u.id = g.user_id
           LEFT JOIN (SELECT guardian_id, COUNT(*) AS n FROM students GROUP BY guardian_id) sc
             ON sc.guardian_id = g.id",
    fields: &[
        ("get_first_name", "u.first_name", Kind::Text),
        ("get_last_name", "u.last_name", Kind::Text),
        ("get_student_count", "COALESCE(sc.n, 0)", Kind::Int),
        ("created_at", "g.created_at", Kind::Timestamp),
        ("updated_at", "g.updated_at", Kind::Timestamp),
        ("zip", "g.zip", Kind::Text),
        ("user__first_name", "u.first_name", Kind::Text),
        ("user__last_name", "u.last_name", Kind::Text),
        ("user__username", "u.username", Kind::Text),
    ],
};

const STUDENT: Source = Source {
    id: "s.id",
    from: "students s
           JOIN guardians g ON g.id = s.guardian_id
           JOIN users gu ON gu.id = g.user_id",
    fields: &[
        ("first_name", "s.first_name", Kind::Text),
        ("last_name", "s.last_name", Kind::Text),
        ("gender", "s.gender", Kind::Text),
        ("guardian", "(gu.first_name || ' ' || gu.last_name)", Kind::Text),
        ("created_at", "s.created_at", Kind::Timestamp),
        ("updated_at", "s.updated_at", Kind::Timestamp),
        ("active", "s.active", Kind::Bool),
        ("guardian__user__first_name", "gu.first_name", Kind::Text),
        ("guardian__user__last_name", "gu.last_name", Kind::Text),
    ],
};

fn source_for(model: &str) -> Option<&'static Source> {
    match model {
        "user" => Some(&USER),
        "guardian" => Some(&GUARDIAN),
        "student" => Some(&STUDENT),
        _ => None,
    }
}

impl Source {
    fn field(&self, name: &str) -> Option<(&'static str, Kind)> {
        self.fields
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, expr, kind)| (*expr, *kind))
    }
}

#[derive(Debug, Error)]
pub enum ChangelistError {
    #[error("model {0} has no storage in this workspace")]
    NoStorage(String),
    #[error("{0} is not a list filter")]
    NotFilterable(String),
    #[error("{0} is not sortable")]
    NotSortable(String),
    #[error("bad value for filter {0}")]
    BadFilterValue(String),
    #[error("page {0} is out of range")]
    PageOutOfRange(i64),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

#[derive(Debug, Default, Clone)]
pub struct Query {
    pub q: Option<String>,
    pub filters: Vec<(String, serde_json::Value)>,
    pub ordering: Vec<String>,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug)]
pub struct Page {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub rows: Vec<serde_json::Value>,
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('%');
    for ch in s.chars() {
        if ch == '%' || ch == '_' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn filter_value(field: &str, kind: Kind, v: &serde_json::Value) -> Result<Value, ChangelistError> {
    let bad = || ChangelistError::BadFilterValue(field.to_string());
    match kind {
        Kind::Bool => match v {
            serde_json::Value::Bool(b) => Ok(Value::Integer(*b as i64)),
            serde_json::Value::Number(n) => n.as_i64().map(|i| Value::Integer((i != 0) as i64)).ok_or_else(bad),
            serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(Value::Integer(1)),
                "0" | "false" | "no" => Ok(Value::Integer(0)),
                _ => Err(bad()),
            },
            _ => Err(bad()),
        },
        Kind::Int => v
            .as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .map(Value::Integer)
            .ok_or_else(bad),
        Kind::Text | Kind::Timestamp => match v {
            serde_json::Value::String(s) => Ok(Value::Text(s.trim().to_string())),
            serde_json::Value::Number(n) => Ok(Value::Text(n.to_string())),
            _ => Err(bad()),
        },
    }
}

fn to_json(v: Value, kind: Kind) -> serde_json::Value {
    match (v, kind) {
        (Value::Null, _) => serde_json::Value::Null,
        (Value::Integer(i), Kind::Bool) => json!(i != 0),
        (Value::Integer(i), _) => json!(i),
        (Value::Real(f), _) => json!(f),
        (Value::Text(s), _) => json!(s),
        (Value::Blob(_), _) => serde_json::Value::Null,
    }
}

pub fn query(conn: &Connection, admin: &ModelAdmin, q: &Query) -> Result<Page, ChangelistError> {
    let src = source_for(admin.key).ok_or_else(|| ChangelistError::NoStorage(admin.key.to_string()))?;

    let mut wheres: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();

    // Every search term must hit at least one search field.
    if let Some(text) = q.q.as_deref() {
        for term in text.split_whitespace() {
            let ors = admin
                .search_fields
                .iter()
                .filter_map(|f| src.field(f))
                .map(|(expr, _)| format!("{expr} LIKE ? ESCAPE '\\'"))
                .collect::<Vec<_>>();
            if ors.is_empty() {
                break;
            }
            for _ in &ors {
                binds.push(Value::Text(escape_like(term)));
            }
            wheres.push(format!("({})", ors.join(" OR ")));
        }
    }

    for (name, v) in &q.filters {
        if !admin.list_filter.contains(&name.as_str()) {
            return Err(ChangelistError::NotFilterable(name.clone()));
        }
        let (expr, kind) = src
            .field(name)
            .ok_or_else(|| ChangelistError::NotFilterable(name.clone()))?;
        let bound = filter_value(name, kind, v)?;
        if kind == Kind::Timestamp {
            wheres.push(format!("substr({expr}, 1, length(?)) = ?"));
            binds.push(bound.clone());
            binds.push(bound);
        } else {
            wheres.push(format!("{expr} = ?"));
            binds.push(bound);
        }
    }

    let ordering: Vec<String> = if q.ordering.is_empty() {
        admin.ordering.iter().map(|s| s.to_string()).collect()
    } else {
        q.ordering.clone()
    };
    let mut order_by = Vec::new();
    for o in &ordering {
        let (desc, name) = match o.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, o.as_str()),
        };
        if !admin.sortable(name) {
            return Err(ChangelistError::NotSortable(name.to_string()));
        }
        let (expr, _) = src
            .field(name)
            .ok_or_else(|| ChangelistError::NotSortable(name.to_string()))?;
        order_by.push(format!("{expr} {}", if desc { "DESC" } else { "ASC" }));
    }
    order_by.push(format!("{} ASC", src.id));

    let where_sql = if wheres.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", wheres.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} {where_sql}", src.from),
        params_from_iter(binds.iter()),
        |r| r.get(0),
    )?;

    let per_page = if q.per_page <= 0 {
        DEFAULT_PER_PAGE
    } else {
        q.per_page.min(MAX_PER_PAGE)
    };
    let page = q.page.max(1);
    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or(ChangelistError::PageOutOfRange(page))?;

    let cols = admin
        .list_display
        .iter()
        .filter_map(|c| src.field(c.field).map(|(expr, kind)| (c.field, expr, kind)))
        .collect::<Vec<_>>();
    let select = std::iter::once(src.id.to_string())
        .chain(cols.iter().map(|(_, expr, _)| expr.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {select} FROM {} {where_sql} ORDER BY {} LIMIT {per_page} OFFSET {offset}",
        src.from,
        order_by.join(", "),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds.iter()), |r| {
            let mut obj = Map::new();
            obj.insert("id".into(), json!(r.get::<_, String>(0)?));
            for (i, (field, _, kind)) in cols.iter().enumerate() {
                obj.insert(field.to_string(), to_json(r.get::<_, Value>(i + 1)?, *kind));
            }
            Ok(serde_json::Value::Object(obj))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        total,
        page,
        per_page,
        rows,
    })
}
