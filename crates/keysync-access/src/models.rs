//! Wire models for the access-control service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person record in the access-control system.
///
/// `secondary_identification` carries the stringified member number for
/// records created by this system.  Records without it (or with a value that
/// does not resolve against the current roster) are foreign and are never
/// touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPerson {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_identification: Option<String>,
}

/// Create/replace payload for a person record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_identification: Option<String>,
}

/// A phone-based access medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneMedium {
    pub id: i64,
    /// Owning person; `None` means the phone is an orphan.
    #[serde(default)]
    pub person_id: Option<i64>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Set while a pairing code is outstanding.
    #[serde(default)]
    pub pairing_code_valid_until: Option<DateTime<Utc>>,
    /// Set once a device completed registration.
    #[serde(default)]
    pub device_identifier: Option<String>,
}

/// Device-pairing lifecycle of a phone medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    /// A pairing code was sent and has not expired.
    PairingCodePending { valid_until: DateTime<Utc> },
    Registered,
}

impl PhoneMedium {
    /// Derive the registration state at a given instant.
    ///
    /// An expired pairing code counts as unregistered again; the medium is
    /// registered as soon as a device identifier is bound, regardless of any
    /// leftover code timestamp.
    pub fn registration_state(&self, now: DateTime<Utc>) -> RegistrationState {
        if self.device_identifier.is_some() {
            return RegistrationState::Registered;
        }
        match self.pairing_code_valid_until {
            Some(valid_until) if valid_until > now => {
                RegistrationState::PairingCodePending { valid_until }
            }
            _ => RegistrationState::Unregistered,
        }
    }
}

/// Create/replace payload for a phone medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneRequest {
    pub phone_number: String,
}

/// Lifecycle state of an area authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationState {
    Active,
    DeletionRequested,
    Deleted,
}

/// An area authorization granted to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaAuthorization {
    pub id: i64,
    pub person_id: i64,
    pub area_id: i64,
    pub state: AuthorizationState,
}

impl AreaAuthorization {
    /// Soft-deleted authorizations count as "not authorized".
    pub fn is_deleted(&self) -> bool {
        matches!(
            self.state,
            AuthorizationState::DeletionRequested | AuthorizationState::Deleted
        )
    }
}
