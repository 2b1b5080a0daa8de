//! Explicit persistence context for accounts, guardians and students.
//!
//! A `Store` borrows whatever connection the caller hands it, which is a
//! per-row savepoint during imports. Nothing here opens or caches connections.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

pub const ROLE_GUARDIAN: &str = "guardian";

const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%SZ','now')";

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Guardian {
    pub id: String,
    pub user_id: String,
    pub phone: String,
    pub zip: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: String,
    pub guardian_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: NaiveDate,
    pub gender: String,
    pub school_name: String,
    pub school_type: String,
    pub photo_release: bool,
    pub consent: bool,
    pub active: bool,
}

/// Guardian joined with its account, in export column order.
#[derive(Debug, Clone)]
pub struct GuardianExport {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub zip: String,
}

/// Student joined with its guardian's account email.
#[derive(Debug, Clone)]
pub struct StudentExport {
    pub student: Student,
    pub guardian_email: String,
}

pub struct Store<'c> {
    conn: &'c Connection,
}

fn account_from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        email: r.get(1)?,
        username: r.get(2)?,
        first_name: r.get(3)?,
        last_name: r.get(4)?,
        role: r.get(5)?,
    })
}

fn guardian_from_row(r: &Row<'_>) -> rusqlite::Result<Guardian> {
    Ok(Guardian {
        id: r.get(0)?,
        user_id: r.get(1)?,
        phone: r.get(2)?,
        zip: r.get(3)?,
        active: r.get::<_, i64>(4)? != 0,
    })
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        guardian_id: r.get(1)?,
        first_name: r.get(2)?,
        last_name: r.get(3)?,
        birthday: r.get(4)?,
        gender: r.get(5)?,
        school_name: r.get(6)?,
        school_type: r.get(7)?,
        photo_release: r.get::<_, i64>(8)? != 0,
        consent: r.get::<_, i64>(9)? != 0,
        active: r.get::<_, i64>(10)? != 0,
    })
}

const ACCOUNT_COLS: &str = "u.id, u.email, u.username, u.first_name, u.last_name, u.role";
const GUARDIAN_COLS: &str = "g.id, g.user_id, g.phone, g.zip, g.active";
const STUDENT_COLS: &str = "s.id, s.guardian_id, s.first_name, s.last_name, s.birthday, s.gender,
     s.school_name, s.school_type, s.photo_release, s.consent, s.active";

impl<'c> Store<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Oldest account whose email matches, ignoring case and surrounding space.
    pub fn find_account_by_email(&self, email: &str) -> rusqlite::Result<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLS} FROM users u
             WHERE lower(u.email) = lower(trim(?))
             ORDER BY u.date_joined, u.rowid
             LIMIT 1"
        );
        self.conn
            .query_row(&sql, [email], account_from_row)
            .optional()
    }

    pub fn find_guardian_by_user(&self, user_id: &str) -> rusqlite::Result<Option<Guardian>> {
        let sql = format!("SELECT {GUARDIAN_COLS} FROM guardians g WHERE g.user_id = ?");
        self.conn
            .query_row(&sql, [user_id], guardian_from_row)
            .optional()
    }

    pub fn find_guardian_by_email(&self, email: &str) -> rusqlite::Result<Option<Guardian>> {
        let sql = format!(
            "SELECT {GUARDIAN_COLS} FROM guardians g
             JOIN users u ON u.id = g.user_id
             WHERE lower(u.email) = lower(trim(?))
             ORDER BY u.date_joined, u.rowid
             LIMIT 1"
        );
        self.conn
            .query_row(&sql, [email], guardian_from_row)
            .optional()
    }

    pub fn find_students_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> rusqlite::Result<Vec<Student>> {
        let sql = format!(
            "SELECT {STUDENT_COLS} FROM students s
             WHERE lower(s.first_name) = lower(trim(?)) AND lower(s.last_name) = lower(trim(?))
             ORDER BY s.created_at, s.rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([first_name, last_name], student_from_row)?;
        rows.collect()
    }

    #[cfg(test)]
    pub fn get_student(&self, id: &str) -> rusqlite::Result<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLS} FROM students s WHERE s.id = ?");
        self.conn.query_row(&sql, [id], student_from_row).optional()
    }

    pub fn save_account(&self, a: &Account) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO users(id, email, username, first_name, last_name, role, date_joined)
             VALUES(?, ?, ?, ?, ?, ?, {NOW_SQL})
             ON CONFLICT(id) DO UPDATE SET
               email = excluded.email,
               username = excluded.username,
               first_name = excluded.first_name,
               last_name = excluded.last_name,
               role = excluded.role"
        );
        self.conn.execute(
            &sql,
            (&a.id, &a.email, &a.username, &a.first_name, &a.last_name, &a.role),
        )?;
        Ok(())
    }

    pub fn save_guardian(&self, g: &Guardian) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO guardians(id, user_id, phone, zip, active, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, {NOW_SQL}, {NOW_SQL})
             ON CONFLICT(id) DO UPDATE SET
               user_id = excluded.user_id,
               phone = excluded.phone,
               zip = excluded.zip,
               active = excluded.active,
               updated_at = excluded.updated_at"
        );
        self.conn.execute(
            &sql,
            (&g.id, &g.user_id, &g.phone, &g.zip, g.active as i64),
        )?;
        Ok(())
    }

    pub fn save_student(&self, s: &Student) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO students(
               id, guardian_id, first_name, last_name, birthday, gender,
               school_name, school_type, photo_release, consent, active,
               created_at, updated_at
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, {NOW_SQL}, {NOW_SQL})
             ON CONFLICT(id) DO UPDATE SET
               guardian_id = excluded.guardian_id,
               first_name = excluded.first_name,
               last_name = excluded.last_name,
               birthday = excluded.birthday,
               gender = excluded.gender,
               school_name = excluded.school_name,
               school_type = excluded.school_type,
               photo_release = excluded.photo_release,
               consent = excluded.consent,
               active = excluded.active,
               updated_at = excluded.updated_at"
        );
        self.conn.execute(
            &sql,
            (
                &s.id,
                &s.guardian_id,
                &s.first_name,
                &s.last_name,
                &s.birthday,
                &s.gender,
                &s.school_name,
                &s.school_type,
                s.photo_release as i64,
                s.consent as i64,
                s.active as i64,
            ),
        )?;
        Ok(())
    }

    pub fn export_guardians(&self) -> rusqlite::Result<Vec<GuardianExport>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.first_name, u.last_name, u.email, g.phone, g.zip
             FROM guardians g
             JOIN users u ON u.id = g.user_id
             ORDER BY g.created_at DESC, g.rowid DESC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(GuardianExport {
                first_name: r.get(0)?,
                last_name: r.get(1)?,
                email: r.get(2)?,
                phone: r.get(3)?,
                zip: r.get(4)?,
            })
        })?;
        rows.collect()
    }

    pub fn export_students(&self) -> rusqlite::Result<Vec<StudentExport>> {
        let sql = format!(
            "SELECT {STUDENT_COLS}, u.email
             FROM students s
             JOIN guardians g ON g.id = s.guardian_id
             JOIN users u ON u.id = g.user_id
             ORDER BY s.guardian_id, s.rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |r| {
            Ok(StudentExport {
                student: student_from_row(r)?,
                guardian_email: r.get(11)?,
            })
        })?;
        rows.collect()
    }

    pub fn count(&self, table: Table) -> rusqlite::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        self.conn.query_row(&sql, [], |r| r.get(0))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Table {
    Users,
    Guardians,
    Students,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Guardians => "guardians",
            Table::Students => "students",
        }
    }
}
