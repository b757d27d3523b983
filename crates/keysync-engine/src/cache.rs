//! In-process snapshot of the access-control system.
//!
//! Built by paginated full-table fetch and indexed by member number through
//! the correlation field, so every reconciliation decision routes through
//! correlated ids and never through name matching.  Entries use a staged
//! overlay: a planned mutation stages a pending value (in dry-run too) and
//! a confirmed remote write commits it, so later passes observe the effect
//! of earlier passes identically in both modes.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use keysync_access::{AccessApi, AccessPerson, AreaAuthorization, PhoneMedium};
use keysync_directory::Member;

use crate::correlation::correlate;
use crate::error::EngineResult;

/// Page size for full-table fetches; a short or empty page ends the fetch.
pub const FETCH_PAGE_SIZE: usize = 100;

/// A cache entry carrying a base value and an optional pending value.
///
/// `effective` prefers the pending value, so decisions downstream of a
/// planned mutation see its effect before (or without) the remote write.
/// `commit` promotes pending to base once the write is confirmed.
#[derive(Debug, Clone)]
pub struct Staged<T> {
    base: Option<T>,
    pending: Option<T>,
}

impl<T> Default for Staged<T> {
    fn default() -> Self {
        Self {
            base: None,
            pending: None,
        }
    }
}

impl<T> Staged<T> {
    /// Entry backed by a value the remote system confirmed.
    pub fn of(value: T) -> Self {
        Self {
            base: Some(value),
            pending: None,
        }
    }

    /// Entry for a planned value with no remote counterpart yet.
    pub fn planned(value: T) -> Self {
        Self {
            base: None,
            pending: Some(value),
        }
    }

    pub fn effective(&self) -> Option<&T> {
        self.pending.as_ref().or(self.base.as_ref())
    }

    pub fn stage(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// Promote the pending value to base after a confirmed write.
    pub fn commit(&mut self) {
        if let Some(value) = self.pending.take() {
            self.base = Some(value);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Snapshot of remote persons, phone media and authorizations, keyed by
/// member number.  Discarded at process exit; nothing persists across runs.
#[derive(Debug, Default)]
pub struct RemoteCache {
    pub(crate) persons: HashMap<i64, Staged<AccessPerson>>,
    pub(crate) member_by_person: HashMap<i64, i64>,
    pub(crate) phones: HashMap<i64, Staged<PhoneMedium>>,
    /// Unassigned phones found during load; always cleanup targets.
    pub(crate) orphan_phones: Vec<PhoneMedium>,
    /// Phones owned by foreign persons; reported but never mutated.
    pub(crate) foreign_phones: Vec<PhoneMedium>,
    pub(crate) authorizations: HashMap<i64, Vec<AreaAuthorization>>,
    pub(crate) foreign_person_count: usize,
    persons_loaded: bool,
    phones_loaded: bool,
    authorizations_loaded: bool,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Fetch and index all person records.  Idempotent per run.
    ///
    /// `members` is the correlation domain: the full membership directory,
    /// not just the key-holder roster, so a member who merely lost key
    /// access still correlates and can be deprovisioned.
    pub async fn load_persons(
        &mut self,
        api: &dyn AccessApi,
        members: &HashMap<i64, Member>,
    ) -> EngineResult<()> {
        if self.persons_loaded {
            return Ok(());
        }

        let mut offset = 0;
        loop {
            let page = api.list_persons(offset, FETCH_PAGE_SIZE).await?;
            let fetched = page.len();
            for person in page {
                match correlate(person.secondary_identification.as_deref(), members) {
                    Some(member_no) => {
                        if self.persons.contains_key(&member_no) {
                            warn!(
                                member_no,
                                person_id = person.id,
                                "duplicate person record for member; keeping the first"
                            );
                            continue;
                        }
                        self.member_by_person.insert(person.id, member_no);
                        self.persons.insert(member_no, Staged::of(person));
                    }
                    None => self.foreign_person_count += 1,
                }
            }
            if fetched < FETCH_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        debug!(
            correlated = self.persons.len(),
            foreign = self.foreign_person_count,
            "loaded person records"
        );
        self.persons_loaded = true;
        Ok(())
    }

    /// Fetch and index all phone media.  Requires the person index for
    /// transitive correlation; loads it on demand.  Unassigned phones are
    /// recorded as orphans and scheduled for deletion.
    pub async fn load_phones(
        &mut self,
        api: &dyn AccessApi,
        members: &HashMap<i64, Member>,
    ) -> EngineResult<()> {
        if self.phones_loaded {
            return Ok(());
        }
        self.load_persons(api, members).await?;

        let mut offset = 0;
        loop {
            let page = api.list_phones(offset, FETCH_PAGE_SIZE).await?;
            let fetched = page.len();
            for phone in page {
                let Some(person_id) = phone.person_id else {
                    debug!(phone_id = phone.id, "found orphaned phone medium");
                    self.orphan_phones.push(phone);
                    continue;
                };
                match self.member_by_person.get(&person_id) {
                    Some(&member_no) => {
                        if self.phones.contains_key(&member_no) {
                            warn!(
                                member_no,
                                phone_id = phone.id,
                                "member already has a phone medium; keeping the first"
                            );
                            continue;
                        }
                        self.phones.insert(member_no, Staged::of(phone));
                    }
                    None => {
                        debug!(
                            phone_id = phone.id,
                            person_id, "phone belongs to a foreign person; leaving it alone"
                        );
                        self.foreign_phones.push(phone);
                    }
                }
            }
            if fetched < FETCH_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        self.orphan_phones.sort_by_key(|p| p.id);
        self.foreign_phones.sort_by_key(|p| p.id);
        debug!(
            correlated = self.phones.len(),
            orphans = self.orphan_phones.len(),
            "loaded phone media"
        );
        self.phones_loaded = true;
        Ok(())
    }

    /// Fetch and index all authorizations.  An authorization whose owning
    /// person can not be resolved is logged and excluded; partial data is
    /// acceptable, only directly-resolvable records matter for convergence.
    pub async fn load_authorizations(
        &mut self,
        api: &dyn AccessApi,
        members: &HashMap<i64, Member>,
    ) -> EngineResult<()> {
        if self.authorizations_loaded {
            return Ok(());
        }
        self.load_persons(api, members).await?;

        let mut offset = 0;
        loop {
            let page = api.list_authorizations(offset, FETCH_PAGE_SIZE).await?;
            let fetched = page.len();
            for authorization in page {
                match self.member_by_person.get(&authorization.person_id) {
                    Some(&member_no) => {
                        self.authorizations
                            .entry(member_no)
                            .or_default()
                            .push(authorization);
                    }
                    None => {
                        warn!(
                            authorization_id = authorization.id,
                            person_id = authorization.person_id,
                            "authorization owner could not be resolved; excluding it"
                        );
                    }
                }
            }
            if fetched < FETCH_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        for authorizations in self.authorizations.values_mut() {
            authorizations.sort_by_key(|a| a.id);
        }
        debug!(
            members = self.authorizations.len(),
            "loaded authorizations"
        );
        self.authorizations_loaded = true;
        Ok(())
    }

    // ── Person index ─────────────────────────────────────────────────

    pub fn person(&self, member_no: i64) -> Option<&AccessPerson> {
        self.persons.get(&member_no).and_then(Staged::effective)
    }

    /// Member numbers with a person record, ascending.
    pub fn person_member_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.persons.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Stage a person value for a member, creating the entry if needed.
    /// A confirmed remote id is added to the reverse index.
    pub fn stage_person(&mut self, member_no: i64, person: AccessPerson) {
        if person.id != 0 {
            self.member_by_person.insert(person.id, member_no);
        }
        self.persons
            .entry(member_no)
            .or_default()
            .stage(person);
    }

    pub fn commit_person(&mut self, member_no: i64) {
        if let Some(entry) = self.persons.get_mut(&member_no) {
            entry.commit();
        }
    }

    pub fn remove_person(&mut self, member_no: i64) {
        if let Some(entry) = self.persons.remove(&member_no) {
            if let Some(person) = entry.effective() {
                self.member_by_person.remove(&person.id);
            }
        }
    }

    // ── Phone index ──────────────────────────────────────────────────

    pub fn phone(&self, member_no: i64) -> Option<&PhoneMedium> {
        self.phones.get(&member_no).and_then(Staged::effective)
    }

    /// Member numbers with a phone medium, ascending.
    pub fn phone_member_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.phones.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Correlated phones in member order.
    pub fn phones_by_member(&self) -> BTreeMap<i64, &PhoneMedium> {
        self.phones
            .iter()
            .filter_map(|(member_no, entry)| entry.effective().map(|p| (*member_no, p)))
            .collect()
    }

    pub fn stage_phone(&mut self, member_no: i64, phone: PhoneMedium) {
        self.phones.entry(member_no).or_default().stage(phone);
    }

    pub fn commit_phone(&mut self, member_no: i64) {
        if let Some(entry) = self.phones.get_mut(&member_no) {
            entry.commit();
        }
    }

    pub fn remove_phone(&mut self, member_no: i64) {
        self.phones.remove(&member_no);
    }

    /// Drain the orphan list for cleanup.
    pub fn take_orphan_phones(&mut self) -> Vec<PhoneMedium> {
        std::mem::take(&mut self.orphan_phones)
    }

    /// Phones that could not be correlated: orphans plus foreign-owned,
    /// by phone id.  Used for reporting only.
    pub fn uncorrelated_phones(&self) -> Vec<&PhoneMedium> {
        let mut phones: Vec<&PhoneMedium> = self
            .orphan_phones
            .iter()
            .chain(self.foreign_phones.iter())
            .collect();
        phones.sort_by_key(|p| p.id);
        phones
    }

    // ── Authorization index ──────────────────────────────────────────

    /// Non-deleted authorizations for a member.  Soft-deleted records are
    /// excluded: a person whose authorization was deletion-requested counts
    /// as currently unauthorized.
    pub fn active_authorizations(&self, member_no: i64) -> Vec<&AreaAuthorization> {
        self.authorizations
            .get(&member_no)
            .map(|auths| auths.iter().filter(|a| !a.is_deleted()).collect())
            .unwrap_or_default()
    }

    /// Members holding at least one non-deleted authorization, ascending.
    pub fn authorized_member_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .authorizations
            .iter()
            .filter(|(_, auths)| auths.iter().any(|a| !a.is_deleted()))
            .map(|(member_no, _)| *member_no)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Flip a member's non-deleted authorizations to deletion-requested
    /// after the batch was submitted (or planned, in dry-run).
    pub fn mark_authorizations_deletion_requested(&mut self, member_no: i64) {
        if let Some(auths) = self.authorizations.get_mut(&member_no) {
            for authorization in auths.iter_mut().filter(|a| !a.is_deleted()) {
                authorization.state = keysync_access::AuthorizationState::DeletionRequested;
            }
        }
    }
}
