//! Access-control API trait.
//!
//! The reconciliation engine programs against this trait; the live client
//! implements it over HTTP and tests implement it in memory.

use async_trait::async_trait;

use crate::error::AccessResult;
use crate::models::{AccessPerson, AreaAuthorization, PersonRequest, PhoneMedium, PhoneRequest};

/// Operations the access-control service exposes.
///
/// All list operations are paginated with caller-supplied offset/limit; an
/// empty page signals end-of-data.  Deletion of an authorization is a soft
/// delete (deletion-requested flag) and is submitted as a batch.
#[async_trait]
pub trait AccessApi: Send + Sync {
    // ── Persons ──────────────────────────────────────────────────────

    async fn list_persons(&self, offset: usize, limit: usize) -> AccessResult<Vec<AccessPerson>>;

    async fn create_person(&self, request: &PersonRequest) -> AccessResult<AccessPerson>;

    async fn update_person(&self, id: i64, request: &PersonRequest) -> AccessResult<AccessPerson>;

    async fn delete_person(&self, id: i64) -> AccessResult<()>;

    // ── Phone media ──────────────────────────────────────────────────

    async fn list_phones(&self, offset: usize, limit: usize) -> AccessResult<Vec<PhoneMedium>>;

    async fn create_phone(&self, request: &PhoneRequest) -> AccessResult<PhoneMedium>;

    async fn update_phone(&self, id: i64, request: &PhoneRequest) -> AccessResult<PhoneMedium>;

    async fn delete_phone(&self, id: i64) -> AccessResult<()>;

    /// Assign a phone medium to a person record.
    async fn assign_phone(&self, phone_id: i64, person_id: i64) -> AccessResult<()>;

    // ── Authorizations ───────────────────────────────────────────────

    async fn list_authorizations(
        &self,
        offset: usize,
        limit: usize,
    ) -> AccessResult<Vec<AreaAuthorization>>;

    async fn create_authorization(
        &self,
        person_id: i64,
        area_id: i64,
    ) -> AccessResult<AreaAuthorization>;

    /// Request deletion of a batch of authorizations (soft delete).
    async fn request_authorization_deletion(&self, authorization_ids: &[i64]) -> AccessResult<()>;

    // ── Device registration ──────────────────────────────────────────

    /// Generate a fresh pairing code for a phone; returns the refreshed
    /// medium carrying the new validity timestamp.
    async fn generate_pairing_code(&self, phone_id: i64) -> AccessResult<PhoneMedium>;

    /// Deliver the registration code to the phone.
    async fn send_registration_code(&self, phone_id: i64) -> AccessResult<()>;
}
