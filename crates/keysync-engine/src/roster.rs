//! Key-holder roster.
//!
//! The authoritative set of people who should hold an access credential,
//! resolved by matching configured aliases against the directory's custom
//! lists and taking the union of their members.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use keysync_directory::{DirectorySource, Member};

use crate::error::{EngineError, EngineResult};

/// How key-holders are selected from the directory.
#[derive(Debug, Clone, Default)]
pub struct HolderSelection {
    /// List aliases that mark a directory list as a key-holder list.
    pub aliases: BTreeSet<String>,
    /// When non-empty, only members holding at least one of these role keys
    /// stay on the roster.
    pub roles: BTreeSet<String>,
}

/// The authoritative key-holder set for one reconciliation run.
#[derive(Debug, Default)]
pub struct Roster {
    members: HashMap<i64, Member>,
}

impl Roster {
    /// Resolve key-holders from the directory.
    ///
    /// Fetches all custom lists with members and keeps those whose alias
    /// set intersects the configured aliases, optionally restricted to
    /// members holding one of the configured role keys.  Resolving zero
    /// key-holders aborts the run: it means the configuration names no
    /// list that exists, and an empty roster would otherwise deprovision
    /// everyone.
    pub async fn load(
        source: &dyn DirectorySource,
        selection: &HolderSelection,
    ) -> EngineResult<Self> {
        let lists = source.all_lists(true, None).await?;

        let mut members: HashMap<i64, Member> = HashMap::new();
        for (list_id, list) in &lists {
            if list.aliases.is_disjoint(&selection.aliases) {
                debug!(list_id, title = %list.title, "list does not match any holder alias");
                continue;
            }
            info!(
                list_id,
                title = %list.title,
                members = list.members.len(),
                "resolved key-holder list"
            );
            for (member_no, member) in &list.members {
                members.entry(*member_no).or_insert_with(|| member.clone());
            }
        }

        if !selection.roles.is_empty() {
            let before = members.len();
            members.retain(|member_no, member| {
                let keeps_key = member
                    .roles
                    .role_keys()
                    .iter()
                    .any(|key| selection.roles.contains(*key));
                if !keeps_key {
                    debug!(member_no, "member holds no key-holder role; dropping from roster");
                }
                keeps_key
            });
            debug!(
                kept = members.len(),
                dropped = before - members.len(),
                "applied role filter to roster"
            );
        }

        if members.is_empty() {
            return Err(EngineError::NoKeyholders {
                aliases: selection.aliases.iter().cloned().collect(),
            });
        }

        info!(keyholders = members.len(), "key-holder roster resolved");
        Ok(Self { members })
    }

    #[cfg(test)]
    pub(crate) fn from_members(members: HashMap<i64, Member>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &HashMap<i64, Member> {
        &self.members
    }

    pub fn member(&self, member_no: i64) -> Option<&Member> {
        self.members.get(&member_no)
    }

    pub fn contains(&self, member_no: i64) -> bool {
        self.members.contains_key(&member_no)
    }

    /// Member numbers in ascending order.
    pub fn member_ids(&self) -> BTreeSet<i64> {
        self.members.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
