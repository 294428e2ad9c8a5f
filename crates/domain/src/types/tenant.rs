//! Tenant records
//!
//! A tenant is one restaurant account. Only the fields the POS client needs
//! are modelled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Restaurant tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// Names the tenant's POS access-token secret; `None` uses the default
    pub pos_credential_ref: Option<String>,
    /// Default POS location for order and checkout calls
    pub pos_location_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pos_credential_ref: None,
            pos_location_id: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_credential_ref(mut self, credential_ref: impl Into<String>) -> Self {
        self.pos_credential_ref = Some(credential_ref.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.pos_location_id = Some(location_id.into());
        self
    }
}
