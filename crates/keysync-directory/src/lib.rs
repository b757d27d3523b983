//! Membership directory client.
//!
//! Fetches the authoritative member roster and custom member lists from the
//! membership service.  The [`source::DirectorySource`] trait abstracts over
//! the live HTTP client and a replay source that serves previously dumped
//! payloads, so the reconciliation engine can run against either.

pub mod client;
pub mod error;
pub mod models;
pub mod source;

pub use client::DirectoryClient;
pub use error::{DirectoryError, DirectoryResult};
pub use models::{Member, MemberList, MemberRole};
pub use source::{DirectorySource, DumpRecorder, ReplaySource};
