use uuid::Uuid;

use crate::store::{Store, Student};

use super::normalize::{clean_text, parse_birthday, parse_boolish};
use super::resolve::{resolve_guardian_for_student, resolve_student_by_name};
use super::rows::StudentRow;
use super::{ImportError, ImportOptions};

#[derive(Debug, Clone)]
pub struct StudentOutcome {
    pub student: Student,
    pub created: bool,
}

pub fn import_student(
    store: &Store<'_>,
    row: &StudentRow,
    opts: &ImportOptions,
) -> Result<StudentOutcome, ImportError> {
    let first_name = clean_text(&row.first_name);
    let last_name = clean_text(&row.last_name);
    if first_name.is_empty() {
        return Err(ImportError::MissingField("first_name"));
    }
    if last_name.is_empty() {
        return Err(ImportError::MissingField("last_name"));
    }
    let birthday = parse_birthday(&row.birthday)?;
    let guardian_email = clean_text(&row.guardian_email);

    let guardian = resolve_guardian_for_student(store, &guardian_email)?;
    let existing = resolve_student_by_name(store, &first_name, &last_name)?;
    let created = existing.is_none();

    let student = Student {
        id: existing
            .map(|s| s.id)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        guardian_id: guardian.id,
        first_name,
        last_name,
        birthday,
        gender: clean_text(&row.gender),
        school_name: clean_text(&row.school_name),
        school_type: clean_text(&row.school_type),
        photo_release: parse_boolish(&row.photo_release),
        consent: parse_boolish(&row.consent),
        active: true,
    };

    if !opts.dry_run {
        store.save_student(&student)?;
    }

    Ok(StudentOutcome { student, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::import::{import_guardian, GuardianRow};
    use crate::store::Table;
    use chrono::NaiveDate;
    use rusqlite::Connection;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        let row = GuardianRow {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: "ann@x.com".into(),
            phone: "555-1111".into(),
            zip: "60601".into(),
        };
        import_guardian(&Store::new(&conn), &row, &ImportOptions::default()).expect("guardian");
        conn
    }

    fn kid(guardian_email: &str, birthday: &str) -> StudentRow {
        StudentRow {
            first_name: "Max".into(),
            last_name: "Lee".into(),
            guardian_email: guardian_email.into(),
            birthday: birthday.into(),
            gender: "Male".into(),
            school_name: "Lincoln".into(),
            school_type: "Public".into(),
            photo_release: "yes".into(),
            consent: "".into(),
        }
    }

    #[test]
    fn valid_row_creates_active_student() {
        let conn = seeded();
        let store = Store::new(&conn);
        let out = import_student(&store, &kid("ann@x.com", "01/02/2010"), &ImportOptions::default())
            .expect("import");

        assert!(out.created);
        assert!(out.student.active);
        assert_eq!(
            out.student.birthday,
            NaiveDate::from_ymd_opt(2010, 1, 2).expect("date")
        );
        assert!(out.student.photo_release);
        assert!(!out.student.consent);
        assert_eq!(store.get_student(&out.student.id).expect("get"), Some(out.student));
    }

    #[test]
    fn unknown_guardian_names_the_email_and_writes_nothing() {
        let conn = seeded();
        let store = Store::new(&conn);
        let e = import_student(
            &store,
            &kid("nobody@x.com", "01/02/2010"),
            &ImportOptions::default(),
        )
        .expect_err("fails");
        assert_eq!(e.code(), "guardian_not_found");
        assert!(e.to_string().contains("nobody@x.com"), "{e}");
        assert_eq!(store.count(Table::Students).expect("count"), 0);
    }

    #[test]
    fn bad_birthday_fails_the_row() {
        let conn = seeded();
        let store = Store::new(&conn);
        let e = import_student(&store, &kid("ann@x.com", "2010-01-02"), &ImportOptions::default())
            .expect_err("fails");
        assert_eq!(e.code(), "invalid_date");
        assert_eq!(store.count(Table::Students).expect("count"), 0);
    }

    #[test]
    fn same_name_updates_and_reactivates() {
        let conn = seeded();
        let store = Store::new(&conn);
        let first = import_student(&store, &kid("ann@x.com", "01/02/2010"), &ImportOptions::default())
            .expect("first");
        conn.execute("UPDATE students SET active = 0", []).expect("deactivate");

        let mut row = kid("ann@x.com", "03/04/2011");
        row.first_name = "max".into();
        let second = import_student(&store, &row, &ImportOptions::default()).expect("second");

        assert!(!second.created);
        assert_eq!(second.student.id, first.student.id);
        assert_eq!(store.count(Table::Students).expect("count"), 1);
        let stored = store
            .get_student(&first.student.id)
            .expect("get")
            .expect("student");
        assert!(stored.active);
        assert_eq!(stored.birthday, NaiveDate::from_ymd_opt(2011, 3, 4).expect("date"));
    }

    #[test]
    fn failed_reimport_leaves_existing_student_untouched() {
        let conn = seeded();
        let store = Store::new(&conn);
        let first = import_student(&store, &kid("ann@x.com", "01/02/2010"), &ImportOptions::default())
            .expect("first");
        conn.execute("UPDATE students SET active = 0", []).expect("deactivate");
        let before = store
            .get_student(&first.student.id)
            .expect("get")
            .expect("student");

        let mut unknown_guardian = kid("nobody@x.com", "03/04/2011");
        unknown_guardian.school_name = "Other".into();
        let e = import_student(&store, &unknown_guardian, &ImportOptions::default())
            .expect_err("unknown guardian");
        assert_eq!(e.code(), "guardian_not_found");

        let e = import_student(&store, &kid("ann@x.com", "03/04/11"), &ImportOptions::default())
            .expect_err("bad birthday");
        assert_eq!(e.code(), "invalid_date");

        let after = store
            .get_student(&first.student.id)
            .expect("get")
            .expect("student");
        assert_eq!(after, before);
        assert!(!after.active);
        assert_eq!(after.birthday, NaiveDate::from_ymd_opt(2010, 1, 2).expect("date"));
    }

    #[test]
    fn dry_run_validates_without_writing() {
        let conn = seeded();
        let store = Store::new(&conn);
        let opts = ImportOptions {
            dry_run: true,
            ..ImportOptions::default()
        };
        import_student(&store, &kid("ann@x.com", "01/02/2010"), &opts).expect("valid");
        let e = import_student(&store, &kid("nobody@x.com", "01/02/2010"), &opts)
            .expect_err("same failure as a real run");
        assert_eq!(e.code(), "guardian_not_found");
        assert_eq!(store.count(Table::Students).expect("count"), 0);
    }

    #[test]
    fn dry_run_leaves_existing_student_unmodified() {
        let conn = seeded();
        let store = Store::new(&conn);
        let first = import_student(&store, &kid("ann@x.com", "01/02/2010"), &ImportOptions::default())
            .expect("first");

        let mut row = kid("ann@x.com", "03/04/2011");
        row.gender = "Female".into();
        let opts = ImportOptions {
            dry_run: true,
            ..ImportOptions::default()
        };
        let out = import_student(&store, &row, &opts).expect("dry run");
        assert!(!out.created);
        assert_eq!(out.student.id, first.student.id);

        let stored = store
            .get_student(&first.student.id)
            .expect("get")
            .expect("student");
        assert_eq!(stored, first.student);
    }
}
