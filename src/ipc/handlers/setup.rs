use crate::db;
use crate::import::ReimportActive;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Imports,
}

impl SetupSection {
    const ALL: [SetupSection; 1] = [SetupSection::Imports];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "imports" => Some(Self::Imports),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Imports => "imports",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Imports => "setup.imports",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Imports => json!({
            "guardianReimportActive": ReimportActive::default().as_str(),
            "defaultDryRun": false,
            "defaultAtomic": false
        }),
    }
}

/// Effective import defaults for a workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportSettings {
    pub reimport_active: ReimportActive,
    pub default_dry_run: bool,
    pub default_atomic: bool,
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Imports => match k.as_str() {
                "guardianReimportActive" => {
                    let s = parse_string_max(v, k, 24)?.to_ascii_lowercase();
                    if ReimportActive::parse(&s).is_none() {
                        return Err(
                            "guardianReimportActive must be one of: preserve, force_inactive"
                                .into(),
                        );
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "defaultDryRun" | "defaultAtomic" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown imports field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults.
            if let Err(e) = merge_section_patch(section, &mut current, saved_obj) {
                tracing::warn!(section = section.name(), error = %e, "ignoring saved setup");
                current = default_section(section);
            }
        }
    }
    Ok(current)
}

pub fn import_settings(conn: &rusqlite::Connection) -> anyhow::Result<ImportSettings> {
    let v = load_section(conn, SetupSection::Imports)?;
    Ok(ImportSettings {
        reimport_active: v
            .get("guardianReimportActive")
            .and_then(|s| s.as_str())
            .and_then(ReimportActive::parse)
            .unwrap_or_default(),
        default_dry_run: v
            .get("defaultDryRun")
            .and_then(|b| b.as_bool())
            .unwrap_or(false),
        default_atomic: v
            .get("defaultAtomic")
            .and_then(|b| b.as_bool())
            .unwrap_or(false),
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        match load_section(conn, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.name(), "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn defaults_then_saved_values() {
        let conn = mem();
        let s = import_settings(&conn).expect("defaults");
        assert_eq!(s.reimport_active, ReimportActive::Preserve);
        assert!(!s.default_dry_run);

        db::settings_set_json(
            &conn,
            "setup.imports",
            &json!({ "guardianReimportActive": "force_inactive", "defaultDryRun": true }),
        )
        .expect("save");
        let s = import_settings(&conn).expect("saved");
        assert_eq!(s.reimport_active, ReimportActive::ForceInactive);
        assert!(s.default_dry_run);
        assert!(!s.default_atomic);
    }

    #[test]
    fn bad_patch_is_rejected() {
        let mut current = default_section(SetupSection::Imports);
        let patch = json!({ "guardianReimportActive": "sometimes" });
        let e = merge_section_patch(
            SetupSection::Imports,
            &mut current,
            patch.as_object().expect("object"),
        )
        .expect_err("invalid");
        assert!(e.contains("preserve"), "{e}");

        let patch = json!({ "colour": "blue" });
        assert!(merge_section_patch(
            SetupSection::Imports,
            &mut current,
            patch.as_object().expect("object"),
        )
        .is_err());
    }
}
