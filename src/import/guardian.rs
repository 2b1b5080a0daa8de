use uuid::Uuid;

use crate::store::{Account, Guardian, Store, ROLE_GUARDIAN};

use super::normalize::clean_text;
use super::resolve::resolve_guardian_by_account_email;
use super::rows::GuardianRow;
use super::{ImportError, ImportOptions};

/// What re-importing an existing guardian does to its active flag.
/// New guardians are always created inactive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReimportActive {
    #[default]
    Preserve,
    ForceInactive,
}

impl ReimportActive {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preserve" => Some(Self::Preserve),
            "force_inactive" => Some(Self::ForceInactive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::ForceInactive => "force_inactive",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardianOutcome {
    pub account: Account,
    pub guardian: Guardian,
    pub created: bool,
}

pub fn import_guardian(
    store: &Store<'_>,
    row: &GuardianRow,
    opts: &ImportOptions,
) -> Result<GuardianOutcome, ImportError> {
    let email = clean_text(&row.email);
    if email.is_empty() {
        return Err(ImportError::MissingField("email"));
    }

    let (account, mut guardian, created) = match resolve_guardian_by_account_email(store, &email)? {
        Some((account, mut guardian)) => {
            if opts.reimport_active == ReimportActive::ForceInactive {
                guardian.active = false;
            }
            (account, guardian, false)
        }
        None => {
            let account = Account {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                username: email.clone(),
                first_name: clean_text(&row.first_name),
                last_name: clean_text(&row.last_name),
                role: ROLE_GUARDIAN.to_string(),
            };
            let guardian = Guardian {
                id: Uuid::new_v4().to_string(),
                user_id: account.id.clone(),
                phone: String::new(),
                zip: String::new(),
                active: false,
            };
            (account, guardian, true)
        }
    };

    guardian.phone = clean_text(&row.phone);
    guardian.zip = clean_text(&row.zip);

    if !opts.dry_run {
        // Account first so the guardian's reference is valid when written.
        store.save_account(&account)?;
        store.save_guardian(&guardian)?;
    }

    Ok(GuardianOutcome {
        account,
        guardian,
        created,
    })
}
