//! Device registration dispatch.
//!
//! A phone medium starts unregistered, receives a pairing code (valid until
//! a timestamp) and becomes registered once a device binds to it.  Codes
//! are dispatched at most once per validity window and optionally rate
//! limited per invocation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use keysync_access::RegistrationState;

use crate::cache::RemoteCache;
use crate::error::EngineResult;
use crate::sync::SyncService;

/// One phone with an outstanding, unexpired pairing code.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRegistration {
    pub phone_id: i64,
    /// Display name of the owning member, when resolvable.
    pub owner: Option<String>,
    pub phone_number: Option<String>,
    pub valid_until: DateTime<Utc>,
}

impl PendingRegistration {
    pub fn owner_display(&self) -> &str {
        self.owner.as_deref().unwrap_or("anonymous")
    }
}

impl SyncService {
    /// Send pairing codes to unregistered phones, at most `limit` of them
    /// (`None` = unbounded).
    ///
    /// A phone with a still-valid pending code is skipped without consuming
    /// the limit; only actual sends count.  Returns the number of codes
    /// sent.  Phones that do not correlate to a member (orphans, foreign
    /// owners) are never sent codes.
    pub async fn send_pending_registration_codes(
        &self,
        limit: Option<usize>,
    ) -> EngineResult<usize> {
        let members = self.directory().all_members().await?;
        let mut cache = RemoteCache::new();
        cache.load_phones(self.access(), &members).await?;

        let now = Utc::now();
        let mut sent = 0;
        for (member_no, phone) in cache.phones_by_member() {
            if limit.is_some_and(|l| sent >= l) {
                break;
            }
            match phone.registration_state(now) {
                RegistrationState::Registered => {}
                RegistrationState::PairingCodePending { valid_until } => {
                    debug!(
                        member_no,
                        valid_until = %valid_until,
                        "pairing code still valid; not sending another"
                    );
                }
                RegistrationState::Unregistered => {
                    info!(member_no, phone_id = phone.id, "sending registration code");
                    self.access().generate_pairing_code(phone.id).await?;
                    self.access().send_registration_code(phone.id).await?;
                    sent += 1;
                }
            }
        }

        info!(sent, "registration codes dispatched");
        Ok(sent)
    }

    /// Report every phone with an outstanding, unexpired pairing code.
    ///
    /// Correlated phones come first in member order with the member's
    /// display name; uncorrelated phones follow by phone id with no owner.
    pub async fn list_pending_registration_codes(
        &self,
    ) -> EngineResult<Vec<PendingRegistration>> {
        let members = self.directory().all_members().await?;
        let mut cache = RemoteCache::new();
        cache.load_phones(self.access(), &members).await?;

        let now = Utc::now();
        let mut pending = Vec::new();

        for (member_no, phone) in cache.phones_by_member() {
            if let RegistrationState::PairingCodePending { valid_until } =
                phone.registration_state(now)
            {
                pending.push(PendingRegistration {
                    phone_id: phone.id,
                    owner: members.get(&member_no).map(|m| m.display_name()),
                    phone_number: phone.phone_number.clone(),
                    valid_until,
                });
            }
        }

        for phone in cache.uncorrelated_phones() {
            if let RegistrationState::PairingCodePending { valid_until } =
                phone.registration_state(now)
            {
                pending.push(PendingRegistration {
                    phone_id: phone.id,
                    owner: None,
                    phone_number: phone.phone_number.clone(),
                    valid_until,
                });
            }
        }

        Ok(pending)
    }
}
