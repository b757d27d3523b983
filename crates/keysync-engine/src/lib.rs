//! # Reconciliation engine
//!
//! Converges the access-control system onto the membership directory: every
//! key-holder ends up with a person record, a phone credential and area
//! authorizations; everyone else loses theirs.  One-directional (the
//! directory is always authoritative) and convergent by re-run rather than
//! transactional: a run that fails partway is simply re-executed and the
//! next full diff picks up where it left off.
//!
//! A run is strictly ordered: fetch the roster, load the remote caches
//! (paginated), then reconcile and mutate persons, phones, orphan cleanup
//! and authorizations, in that order.  Dry-run mode takes every decision
//! and emits every decision log identically but suppresses the mutation
//! calls.

pub mod cache;
pub mod correlation;
pub mod error;
pub mod plan;
pub mod registration;
pub mod roster;
pub mod sync;

pub use cache::RemoteCache;
pub use error::{EngineError, EngineResult};
pub use plan::{AuthorizationPlan, PersonPlan, PhonePlan};
pub use registration::PendingRegistration;
pub use roster::{HolderSelection, Roster};
pub use sync::{SyncOptions, SyncReport, SyncService};
