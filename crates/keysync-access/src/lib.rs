//! Access-control provisioning client.
//!
//! Talks to the physical-access system that manages person records, phone
//! media and area authorizations.  The [`api::AccessApi`] trait is the seam
//! the reconciliation engine programs against; [`client::AccessClient`] is
//! the live HTTP implementation.

pub mod api;
pub mod client;
pub mod error;
pub mod models;

pub use api::AccessApi;
pub use client::AccessClient;
pub use error::{AccessError, AccessResult};
pub use models::{
    AccessPerson, AreaAuthorization, AuthorizationState, PersonRequest, PhoneMedium, PhoneRequest,
    RegistrationState,
};
