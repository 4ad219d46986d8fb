use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Investor,
}

/// Identity of whoever invokes a desk operation.
///
/// Passed explicitly into every call; the engine holds no session state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    pub fn investor(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Investor,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "caller {} is not an administrator",
                self.id
            )))
        }
    }

    /// Admins may act on any account, investors only on their own.
    pub fn require_access_to(&self, account: Uuid) -> Result<(), Error> {
        if self.is_admin() || self.id == account {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "caller {} cannot access account {}",
                self.id, account
            )))
        }
    }
}

/// An investor account. Created and maintained outside the desk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(display_name: &str, email: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        }
    }
}
