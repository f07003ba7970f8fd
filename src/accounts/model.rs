use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored user account.
///
/// `email` is the lookup key and is unique across all accounts.
/// `confirmed_at` is `Some` exactly when `is_enabled` is true.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// New disabled account, not yet confirmed.
    #[must_use]
    pub fn pending(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            confirmed_at: None,
            is_enabled: false,
            created_at: Utc::now(),
        }
    }

    /// Enable the account. The first confirmation time is kept.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        if self.is_enabled {
            return;
        }
        self.is_enabled = true;
        self.confirmed_at = Some(now);
    }
}
