//! Set reconciliation.
//!
//! Pure set algebra between the key-holder roster and the remote snapshot,
//! producing the minimal create/update/delete sets per resource kind.  All
//! output is sorted by member number so log and report order is stable
//! across runs and implementations.

use std::collections::BTreeSet;

use keysync_directory::Member;

use crate::cache::RemoteCache;
use crate::roster::Roster;

/// Reconciliation plan for person records.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PersonPlan {
    pub to_create: Vec<i64>,
    pub to_update: Vec<i64>,
    pub to_delete: Vec<i64>,
}

/// Reconciliation plan for phone media.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PhonePlan {
    pub to_create: Vec<i64>,
    pub to_update: Vec<i64>,
    pub to_delete: Vec<i64>,
    /// Members due for a phone but lacking a contact number; warned and
    /// retried next run.
    pub missing_number: Vec<i64>,
}

/// Reconciliation plan for area authorizations.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AuthorizationPlan {
    /// One entry per missing (member, area) pair.
    pub to_create: Vec<(i64, i64)>,
    /// Members needing authorization but not yet owning a phone medium;
    /// deferred to a later run, not dropped.
    pub deferred: Vec<i64>,
    /// Per no-longer-authoritative member: the non-deleted authorization
    /// ids to batch into a deletion request.
    pub to_deauthorize: Vec<(i64, Vec<i64>)>,
}

fn member_phone_number(member: &Member) -> Option<&str> {
    member
        .contact_mobile_phone
        .as_deref()
        .filter(|n| !n.is_empty())
}

/// Compute the person plan.
///
/// An update is triggered only by a first- or last-name mismatch; phone
/// number changes belong to the phone pass alone.
pub fn plan_persons(roster: &Roster, cache: &RemoteCache) -> PersonPlan {
    let authoritative = roster.member_ids();
    let remote: BTreeSet<i64> = cache.person_member_ids().into_iter().collect();

    let to_update = authoritative
        .intersection(&remote)
        .copied()
        .filter(|&member_no| {
            match (roster.member(member_no), cache.person(member_no)) {
                (Some(member), Some(person)) => {
                    person.first_name != member.first_name()
                        || person.last_name != member.last_name()
                }
                _ => false,
            }
        })
        .collect();

    PersonPlan {
        to_create: authoritative.difference(&remote).copied().collect(),
        to_update,
        to_delete: remote.difference(&authoritative).copied().collect(),
    }
}

/// Compute the phone plan.
///
/// A create for a member without a contact number is diverted to
/// `missing_number`; an update is suppressed when the authoritative number
/// is empty, so a known-good remote number is never overwritten with blank
/// data.
pub fn plan_phones(roster: &Roster, cache: &RemoteCache) -> PhonePlan {
    let authoritative = roster.member_ids();
    let remote: BTreeSet<i64> = cache.phone_member_ids().into_iter().collect();

    let mut to_create = Vec::new();
    let mut missing_number = Vec::new();
    for &member_no in authoritative.difference(&remote) {
        match roster.member(member_no).and_then(member_phone_number) {
            Some(_) => to_create.push(member_no),
            None => missing_number.push(member_no),
        }
    }

    let to_update = authoritative
        .intersection(&remote)
        .copied()
        .filter(|&member_no| {
            let Some(number) = roster.member(member_no).and_then(member_phone_number) else {
                return false;
            };
            cache
                .phone(member_no)
                .map(|phone| phone.phone_number.as_deref() != Some(number))
                .unwrap_or(false)
        })
        .collect();

    PhonePlan {
        to_create,
        to_update,
        to_delete: remote.difference(&authoritative).copied().collect(),
        missing_number,
    }
}

/// Compute the authorization plan.
///
/// Creation is keyed on presence: a roster member with no active
/// authorization for a configured area is a candidate, whether they never
/// had one or all prior ones were soft-deleted.  A member without a phone
/// medium is deferred.  Deauthorization collects, per member no longer on
/// the roster, every non-deleted authorization id into one batch.
pub fn plan_authorizations(
    roster: &Roster,
    cache: &RemoteCache,
    area_ids: &[i64],
) -> AuthorizationPlan {
    let mut areas: Vec<i64> = area_ids.to_vec();
    areas.sort_unstable();
    areas.dedup();

    let mut to_create = Vec::new();
    let mut deferred = Vec::new();
    for member_no in roster.member_ids() {
        let active = cache.active_authorizations(member_no);
        let missing: Vec<i64> = areas
            .iter()
            .copied()
            .filter(|&area_id| !active.iter().any(|a| a.area_id == area_id))
            .collect();
        if missing.is_empty() {
            continue;
        }
        if cache.phone(member_no).is_none() {
            deferred.push(member_no);
            continue;
        }
        to_create.extend(missing.into_iter().map(|area_id| (member_no, area_id)));
    }

    let to_deauthorize = cache
        .authorized_member_ids()
        .into_iter()
        .filter(|&member_no| !roster.contains(member_no))
        .map(|member_no| {
            let ids = cache
                .active_authorizations(member_no)
                .iter()
                .map(|a| a.id)
                .collect();
            (member_no, ids)
        })
        .collect();

    AuthorizationPlan {
        to_create,
        deferred,
        to_deauthorize,
    }
}
