//! Directory data sources.
//!
//! [`DirectorySource`] is the seam between the reconciliation engine and the
//! membership service: the live HTTP client implements it, and so does
//! [`ReplaySource`], which serves payloads previously captured with a
//! [`DumpRecorder`].  A replay run is deterministic and needs no network.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DirectoryError, DirectoryResult};
use crate::models::{parse_lists_payload, parse_member_payload, Member, MemberList};

/// Dump-file key for the raw member-list payload.
pub const DUMP_KEY_MEMBERLIST: &str = "memberlist";
/// Dump-file key for the raw custom-lists payload.
pub const DUMP_KEY_CUSTOMLISTS: &str = "customlists";

/// Source of authoritative membership data.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Fetch every member, keyed by member number.
    async fn all_members(&self) -> DirectoryResult<HashMap<i64, Member>>;

    /// Fetch custom lists, keyed by list id.
    ///
    /// With `fetch_members` set, each list carries its member records.
    /// `list_ids` restricts the result to the given lists.
    async fn all_lists(
        &self,
        fetch_members: bool,
        list_ids: Option<&BTreeSet<i64>>,
    ) -> DirectoryResult<HashMap<i64, MemberList>>;
}

/// Captures fetched payloads verbatim into a single JSON dump file.
///
/// The file is rewritten after every recorded payload so a partially
/// completed run still leaves a usable dump of what was fetched.
pub struct DumpRecorder {
    path: PathBuf,
    payloads: Mutex<HashMap<&'static str, Value>>,
}

impl DumpRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payloads: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_memberlist(&self, payload: &Value) -> DirectoryResult<()> {
        self.record(DUMP_KEY_MEMBERLIST, payload)
    }

    pub fn record_customlists(&self, payload: &Value) -> DirectoryResult<()> {
        self.record(DUMP_KEY_CUSTOMLISTS, payload)
    }

    fn record(&self, key: &'static str, payload: &Value) -> DirectoryResult<()> {
        let mut payloads = self.payloads.lock().expect("dump lock poisoned");
        payloads.insert(key, payload.clone());
        let combined: Value = payloads
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect::<serde_json::Map<String, Value>>()
            .into();
        std::fs::write(&self.path, serde_json::to_vec(&combined)?)?;
        tracing::debug!(path = %self.path.display(), key, "recorded directory payload");
        Ok(())
    }
}

/// Serves directory payloads from a dump file written by [`DumpRecorder`].
pub struct ReplaySource {
    memberlist: Option<Value>,
    customlists: Option<Value>,
}

impl ReplaySource {
    /// Load a dump file from disk.
    pub fn open(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        let raw = std::fs::read(path.as_ref())?;
        let mut combined: serde_json::Map<String, Value> = serde_json::from_slice(&raw)?;
        Ok(Self {
            memberlist: combined.remove(DUMP_KEY_MEMBERLIST),
            customlists: combined.remove(DUMP_KEY_CUSTOMLISTS),
        })
    }
}

#[async_trait]
impl DirectorySource for ReplaySource {
    async fn all_members(&self) -> DirectoryResult<HashMap<i64, Member>> {
        let payload = self
            .memberlist
            .as_ref()
            .ok_or(DirectoryError::ReplayMissing(DUMP_KEY_MEMBERLIST))?;
        parse_member_payload(payload)
    }

    async fn all_lists(
        &self,
        fetch_members: bool,
        list_ids: Option<&BTreeSet<i64>>,
    ) -> DirectoryResult<HashMap<i64, MemberList>> {
        let payload = self
            .customlists
            .as_ref()
            .ok_or(DirectoryError::ReplayMissing(DUMP_KEY_CUSTOMLISTS))?;
        let mut lists = parse_lists_payload(payload)?;
        if let Some(wanted) = list_ids {
            lists.retain(|id, _| wanted.contains(id));
        }
        if !fetch_members {
            for list in lists.values_mut() {
                list.members.clear();
            }
        }
        Ok(lists)
    }
}
