use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::interval::TimeSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Requester,
    Provider,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requester" => Some(Role::Requester),
            "provider" => Some(Role::Provider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Requester => write!(f, "requester"),
            Role::Provider => write!(f, "provider"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Platform account as the core sees it. Identity itself is verified
/// upstream; the core only checks existence and role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// One open interval in a provider's calendar. The id is stable for the
/// slot's lifetime; positional indices in the public API resolve to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    #[serde(flatten)]
    pub slot: TimeSlot,
}

impl AvailabilitySlot {
    pub fn new(slot: TimeSlot) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: Uuid,
    pub display_name: String,
    pub title: String,
    pub availability: Vec<AvailabilitySlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
