//! Wire models for the membership directory.
//!
//! The directory serves member records as a mapping of field name to
//! `{"value": ...}` objects, keyed by stringified member number under a
//! top-level `"data"` key.  Parsing normalizes contact phone numbers to
//! E.164 so every downstream comparison works on a canonical form.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::error::{DirectoryError, DirectoryResult};

/// A role assignment as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemberRole {
    pub role_id: i64,
    pub role_key: String,
}

/// Role assignments grouped by organization unit and by troop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberRoles {
    pub groups: HashMap<i64, Vec<MemberRole>>,
    pub troops: HashMap<i64, Vec<MemberRole>>,
}

impl MemberRoles {
    /// Distinct role keys this member holds across all units.
    pub fn role_keys(&self) -> BTreeSet<&str> {
        self.groups
            .values()
            .chain(self.troops.values())
            .flatten()
            .map(|r| r.role_key.as_str())
            .collect()
    }

    /// True if the member holds at least one role anywhere.
    pub fn is_active(&self) -> bool {
        !self.groups.is_empty() || !self.troops.is_empty()
    }
}

/// An authoritative member record.
///
/// Immutable within one reconciliation run; the roster is fetched once at
/// run start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub member_no: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Contact phone number, already normalized to E.164.
    pub contact_mobile_phone: Option<String>,
    pub roles: MemberRoles,
}

impl Member {
    /// "First Last" with missing parts left out.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => format!("member {}", self.member_no),
        }
    }

    pub fn first_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or_default()
    }

    pub fn last_name(&self) -> &str {
        self.last_name.as_deref().unwrap_or_default()
    }
}

/// A custom member list, matched against configured aliases to resolve
/// key-holder membership.
#[derive(Debug, Clone, Default)]
pub struct MemberList {
    pub title: String,
    pub aliases: BTreeSet<String>,
    pub members: HashMap<i64, Member>,
}

/// Normalize a phone number to E.164.
///
/// Separators (whitespace and dashes) are stripped and a leading national
/// trunk `0` is replaced with `+46`.  A number already carrying a country
/// prefix is returned with separators stripped only.
pub fn normalize_phone_number(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    match stripped.strip_prefix('0') {
        Some(rest) => format!("+46{rest}"),
        None => stripped,
    }
}

// ── Raw wire shapes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FieldValue<T> {
    value: T,
}

#[derive(Debug, Default, Deserialize)]
struct RawRoles {
    #[serde(default)]
    group: HashMap<String, HashMap<String, MemberRole>>,
    #[serde(default)]
    troop: HashMap<String, HashMap<String, MemberRole>>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    member_no: FieldValue<i64>,
    #[serde(default)]
    first_name: Option<FieldValue<String>>,
    #[serde(default)]
    last_name: Option<FieldValue<String>>,
    #[serde(default)]
    contact_mobile_phone: Option<FieldValue<String>>,
    #[serde(default)]
    roles: Option<FieldValue<RawRoles>>,
}

impl RawMember {
    fn into_member(self) -> Member {
        let roles = self.roles.map(|r| r.value).unwrap_or_default();
        Member {
            member_no: self.member_no.value,
            first_name: self.first_name.map(|f| f.value),
            last_name: self.last_name.map(|f| f.value),
            contact_mobile_phone: self
                .contact_mobile_phone
                .map(|f| normalize_phone_number(&f.value)),
            roles: MemberRoles {
                groups: index_roles(roles.group),
                troops: index_roles(roles.troop),
            },
        }
    }
}

fn index_roles(raw: HashMap<String, HashMap<String, MemberRole>>) -> HashMap<i64, Vec<MemberRole>> {
    raw.into_iter()
        .filter_map(|(unit, roles)| {
            let unit_id: i64 = unit.parse().ok()?;
            let mut roles: Vec<MemberRole> = roles.into_values().collect();
            roles.sort_by_key(|r| r.role_id);
            Some((unit_id, roles))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct MemberListPayload {
    #[serde(default)]
    data: HashMap<String, RawMember>,
}

#[derive(Debug, Deserialize)]
struct RawCustomList {
    #[serde(default)]
    title: String,
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    members: Option<HashMap<String, RawMember>>,
}

#[derive(Debug, Deserialize)]
struct CustomListsPayload {
    #[serde(default)]
    data: HashMap<String, RawCustomList>,
}

/// Parse a raw member-list payload into members keyed by member number.
pub fn parse_member_payload(payload: &serde_json::Value) -> DirectoryResult<HashMap<i64, Member>> {
    let payload: MemberListPayload = serde_json::from_value(payload.clone())
        .map_err(|e| DirectoryError::Parse(format!("member list: {e}")))?;
    Ok(payload
        .data
        .into_values()
        .map(|raw| {
            let member = raw.into_member();
            (member.member_no, member)
        })
        .collect())
}

/// Parse a raw custom-lists payload into lists keyed by list id.
///
/// List ids that do not parse as integers are skipped; the directory is not
/// authoritative for anything but member data, so a malformed list entry is
/// not worth failing the run over.
pub fn parse_lists_payload(
    payload: &serde_json::Value,
) -> DirectoryResult<HashMap<i64, MemberList>> {
    let payload: CustomListsPayload = serde_json::from_value(payload.clone())
        .map_err(|e| DirectoryError::Parse(format!("custom lists: {e}")))?;
    let mut lists = HashMap::new();
    for (key, raw) in payload.data {
        let Ok(list_id) = key.parse::<i64>() else {
            tracing::warn!(list = %key, "skipping custom list with non-numeric id");
            continue;
        };
        let members = raw
            .members
            .map(|members| {
                members
                    .into_values()
                    .map(|m| {
                        let member = m.into_member();
                        (member.member_no, member)
                    })
                    .collect()
            })
            .unwrap_or_default();
        lists.insert(
            list_id,
            MemberList {
                title: raw.title,
                aliases: raw.aliases.into_values().collect(),
                members,
            },
        );
    }
    Ok(lists)
}
