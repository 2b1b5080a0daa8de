mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::path::Path;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_ok, spawn_sidecar, temp_dir};

const STUDENT_HEADER: &str =
    "first_name,last_name,guardian_email,birthday,gender,school_name,school_type,photo_release,consent\n";

fn seed_guardian(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let _ = request_ok(
        stdin,
        reader,
        "seed",
        "guardians.import",
        json!({
            "csvText": "first_name,last_name,email,phone,zip\nAnn,Lee,ann@x.com,555-1111,60601\n"
        }),
    );
}

fn snapshot(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &Path,
    tag: &str,
) -> (String, String) {
    let guardians_out = workspace.join(format!("guardians-{tag}.csv"));
    let students_out = workspace.join(format!("students-{tag}.csv"));
    let _ = request_ok(
        stdin,
        reader,
        &format!("{tag}-g"),
        "guardians.export",
        json!({ "outPath": guardians_out.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        &format!("{tag}-s"),
        "students.export",
        json!({ "outPath": students_out.to_string_lossy() }),
    );
    (
        std::fs::read_to_string(&guardians_out).expect("read guardians"),
        std::fs::read_to_string(&students_out).expect("read students"),
    )
}

#[test]
fn student_import_links_guardian_and_reports_missing_ones() {
    let workspace = temp_dir("dojoadmin-students-import");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_guardian(&mut stdin, &mut reader);

    let text = format!(
        "{STUDENT_HEADER}\
         Max,Lee,ann@x.com,01/02/2010,Male,Lincoln,Public,yes,yes\n\
         Ned,Nobody,nobody@x.com,01/02/2010,Male,Lincoln,Public,yes,yes\n\
         Zoe,Lee,ann@x.com,2010-01-02,Female,Lincoln,Public,no,no\n"
    );
    let report = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.import",
        json!({ "csvText": text }),
    );
    assert_eq!(report["created"], json!(1), "{}", report);
    assert_eq!(report["failed"], json!(2));
    assert_eq!(report["rows"][1]["code"], json!("guardian_not_found"));
    assert!(report["rows"][1]["message"]
        .as_str()
        .unwrap_or("")
        .contains("nobody@x.com"));
    assert_eq!(report["rows"][2]["code"], json!("invalid_date"));

    let students = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "admin.changelist",
        json!({ "model": "student" }),
    );
    assert_eq!(students["total"], json!(1));
    assert_eq!(students["rows"][0]["first_name"], json!("Max"));
    assert_eq!(students["rows"][0]["guardian"], json!("Ann Lee"));
    assert_eq!(students["rows"][0]["active"], json!(true));

    let guardians = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "admin.changelist",
        json!({ "model": "guardian" }),
    );
    assert_eq!(guardians["rows"][0]["get_student_count"], json!(1));
}

#[test]
fn student_dry_run_writes_nothing() {
    let workspace = temp_dir("dojoadmin-students-dry-run");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_guardian(&mut stdin, &mut reader);

    let text = format!(
        "{STUDENT_HEADER}\
         Max,Lee,ann@x.com,01/02/2010,Male,Lincoln,Public,yes,yes\n\
         Ned,Nobody,nobody@x.com,01/02/2010,Male,Lincoln,Public,yes,yes\n"
    );
    let dry = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.import",
        json!({ "csvText": text, "dryRun": true }),
    );
    assert_eq!(dry["created"], json!(1));
    assert_eq!(dry["failed"], json!(1));
    assert_eq!(dry["rows"][1]["code"], json!("guardian_not_found"));

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(health["counts"]["students"], json!(0));
}

#[test]
fn exported_students_reimport_as_updates() {
    let workspace = temp_dir("dojoadmin-students-export");
    let out_path = workspace.join("students.csv");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_guardian(&mut stdin, &mut reader);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.import",
        json!({
            "csvText": format!(
                "{STUDENT_HEADER}Max,Lee,ann@x.com,1/2/2010,Male,\"Lincoln, Jr.\",Public,y,n\n"
            )
        }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.export",
        json!({ "outPath": out_path.to_string_lossy() }),
    );
    assert_eq!(exported["rowsExported"], json!(1));
    let text = std::fs::read_to_string(&out_path).expect("read export");
    assert!(text.starts_with(STUDENT_HEADER.trim_end()), "{}", text);
    assert!(text.contains("01/02/2010"), "{}", text);
    assert!(text.contains("\"Lincoln, Jr.\""), "{}", text);

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.import",
        json!({ "inPath": out_path.to_string_lossy() }),
    );
    assert_eq!(again["updated"], json!(1), "{}", again);
    assert_eq!(again["created"], json!(0));

    let guardians_out = workspace.join("guardians.csv");
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "guardians.export",
        json!({ "outPath": guardians_out.to_string_lossy() }),
    );
    assert_eq!(exported["rowsExported"], json!(1));
    let text = std::fs::read_to_string(&guardians_out).expect("read export");
    assert_eq!(
        text,
        "first_name,last_name,email,phone,zip\nAnn,Lee,ann@x.com,555-1111,60601\n"
    );
}

#[test]
fn dry_run_reimport_leaves_existing_records_unmodified() {
    let workspace = temp_dir("dojoadmin-students-dry-update");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed_guardian(&mut stdin, &mut reader);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.import",
        json!({
            "csvText": format!(
                "{STUDENT_HEADER}Max,Lee,ann@x.com,01/02/2010,Male,Lincoln,Public,yes,yes\n"
            )
        }),
    );

    let before = snapshot(&mut stdin, &mut reader, &workspace, "before");

    let guardians = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "guardians.import",
        json!({
            "csvText": "first_name,last_name,email,phone,zip\nAnn,Lee,ann@x.com,555-9999,10001\n",
            "dryRun": true
        }),
    );
    assert_eq!(guardians["updated"], json!(1), "{}", guardians);
    assert_eq!(guardians["committed"], json!(false));

    let students = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.import",
        json!({
            "csvText": format!(
                "{STUDENT_HEADER}Max,Lee,ann@x.com,03/04/2011,Male,Other,Private,no,no\n"
            ),
            "dryRun": true
        }),
    );
    assert_eq!(students["updated"], json!(1), "{}", students);
    assert_eq!(students["committed"], json!(false));

    let after = snapshot(&mut stdin, &mut reader, &workspace, "after");
    assert_eq!(after, before);
    assert!(after.0.contains("555-1111,60601"), "{}", after.0);
    assert!(after.1.contains("01/02/2010"), "{}", after.1);
}
