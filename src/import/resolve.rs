use crate::store::{Account, Guardian, Store, Student};

use super::ImportError;

/// Guardian owned by the account with `email`, if that account exists.
///
/// A missing account is not an error: the caller creates fresh records.
/// An account without a guardian record is.
pub fn resolve_guardian_by_account_email(
    store: &Store<'_>,
    email: &str,
) -> Result<Option<(Account, Guardian)>, ImportError> {
    let Some(account) = store.find_account_by_email(email)? else {
        return Ok(None);
    };
    match store.find_guardian_by_user(&account.id)? {
        Some(guardian) => Ok(Some((account, guardian))),
        None => Err(ImportError::InconsistentData {
            email: email.trim().to_string(),
        }),
    }
}

pub fn resolve_guardian_for_student(
    store: &Store<'_>,
    email: &str,
) -> Result<Guardian, ImportError> {
    store
        .find_guardian_by_email(email)?
        .ok_or_else(|| ImportError::GuardianNotFound {
            email: email.to_string(),
        })
}

pub fn resolve_student_by_name(
    store: &Store<'_>,
    first_name: &str,
    last_name: &str,
) -> Result<Option<Student>, ImportError> {
    let mut found = store.find_students_by_name(first_name, last_name)?;
    if found.len() > 1 {
        return Err(ImportError::Ambiguous {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        });
    }
    Ok(found.pop())
}
