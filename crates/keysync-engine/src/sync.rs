//! Full reconciliation run.
//!
//! [`SyncService`] orchestrates one run: fetch the roster, load the remote
//! caches, then reconcile and mutate persons, phones, orphan cleanup and
//! authorizations, strictly in that order.  Persons come before phones
//! because phone creation needs a resolvable owner; phones before
//! authorizations because authorization needs a provisioned medium; orphan
//! cleanup sits between the two so a freshly orphaned phone is never
//! considered for authorization.
//!
//! Decision logs (info level) carry member-level identifiers only, never
//! remote ids minted during the run, so a dry-run over the same snapshot
//! produces the same log stream as a live run.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use keysync_access::{AccessApi, AccessPerson, PersonRequest, PhoneMedium, PhoneRequest};
use keysync_directory::{DirectorySource, Member};

use crate::cache::RemoteCache;
use crate::error::EngineResult;
use crate::plan;
use crate::roster::{HolderSelection, Roster};

/// Which mutation kinds a run may perform.  Everything defaults to on;
/// dry-run additionally suppresses every remote call.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub create_persons: bool,
    pub update_persons: bool,
    pub delete_persons: bool,
    pub deauthorize: bool,
    pub create_phones: bool,
    pub update_phones: bool,
    pub delete_phones: bool,
    /// Areas each key-holder must be authorized for.
    pub area_ids: Vec<i64>,
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            create_persons: true,
            update_persons: true,
            delete_persons: true,
            deauthorize: true,
            create_phones: true,
            update_phones: true,
            delete_phones: true,
            area_ids: Vec::new(),
            dry_run: false,
        }
    }
}

/// Counters for one reconciliation run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub keyholders: usize,
    pub persons_created: usize,
    pub persons_updated: usize,
    pub persons_deleted: usize,
    pub phones_created: usize,
    pub phones_updated: usize,
    pub phones_deleted: usize,
    pub orphan_phones_deleted: usize,
    pub authorizations_created: usize,
    pub authorizations_deferred: usize,
    pub members_deauthorized: usize,
    pub dry_run: bool,
}

/// Reconciliation service over one directory source and one access API.
pub struct SyncService {
    directory: Box<dyn DirectorySource>,
    access: Box<dyn AccessApi>,
    selection: HolderSelection,
}

impl SyncService {
    pub fn new(
        directory: Box<dyn DirectorySource>,
        access: Box<dyn AccessApi>,
        selection: HolderSelection,
    ) -> Self {
        Self {
            directory,
            access,
            selection,
        }
    }

    pub(crate) fn directory(&self) -> &dyn DirectorySource {
        &*self.directory
    }

    pub(crate) fn access(&self) -> &dyn AccessApi {
        &*self.access
    }

    /// Fetch the correlation domain and the key-holder roster.
    ///
    /// The correlation domain is the full member directory plus any roster
    /// member missing from it, so every record this system ever stamped
    /// with a valid member number keeps resolving.
    pub(crate) async fn load_authoritative(
        &self,
    ) -> EngineResult<(HashMap<i64, Member>, Roster)> {
        let mut members = self.directory.all_members().await?;
        let roster = Roster::load(&*self.directory, &self.selection).await?;
        for (member_no, member) in roster.members() {
            members
                .entry(*member_no)
                .or_insert_with(|| member.clone());
        }
        Ok((members, roster))
    }

    /// Run one full reconciliation.
    pub async fn sync(&self, options: &SyncOptions) -> EngineResult<SyncReport> {
        if options.dry_run {
            info!("dry-run mode: computing changes without writing them");
        }

        let (members, roster) = self.load_authoritative().await?;
        let mut cache = RemoteCache::new();
        cache.load_persons(&*self.access, &members).await?;
        cache.load_phones(&*self.access, &members).await?;
        cache.load_authorizations(&*self.access, &members).await?;

        let mut report = SyncReport {
            keyholders: roster.len(),
            dry_run: options.dry_run,
            ..SyncReport::default()
        };

        self.sync_persons(&roster, &mut cache, options, &mut report)
            .await?;
        self.sync_phones(&roster, &mut cache, options, &mut report)
            .await?;
        self.cleanup_orphan_phones(&mut cache, options, &mut report)
            .await?;
        self.sync_authorizations(&roster, &mut cache, options, &mut report)
            .await?;

        info!(
            persons_created = report.persons_created,
            persons_updated = report.persons_updated,
            persons_deleted = report.persons_deleted,
            phones_created = report.phones_created,
            phones_updated = report.phones_updated,
            phones_deleted = report.phones_deleted,
            orphans_deleted = report.orphan_phones_deleted,
            authorizations_created = report.authorizations_created,
            deauthorized = report.members_deauthorized,
            "reconciliation finished"
        );
        Ok(report)
    }

    // ── Persons ──────────────────────────────────────────────────────

    async fn sync_persons(
        &self,
        roster: &Roster,
        cache: &mut RemoteCache,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> EngineResult<()> {
        let plan = plan::plan_persons(roster, cache);
        debug!(
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            "person plan computed"
        );

        if options.create_persons {
            for &member_no in &plan.to_create {
                let Some(member) = roster.member(member_no) else {
                    continue;
                };
                info!(member_no, name = %member.display_name(), "creating person record");
                let request = PersonRequest {
                    first_name: member.first_name().to_string(),
                    last_name: member.last_name().to_string(),
                    secondary_identification: Some(member_no.to_string()),
                };
                cache.stage_person(
                    member_no,
                    AccessPerson {
                        id: 0,
                        first_name: request.first_name.clone(),
                        last_name: request.last_name.clone(),
                        secondary_identification: request.secondary_identification.clone(),
                    },
                );
                if !options.dry_run {
                    let created = self.access.create_person(&request).await?;
                    cache.stage_person(member_no, created);
                    cache.commit_person(member_no);
                }
                report.persons_created += 1;
            }
        }

        if options.update_persons {
            for &member_no in &plan.to_update {
                let (Some(member), Some(current)) =
                    (roster.member(member_no), cache.person(member_no).cloned())
                else {
                    continue;
                };
                info!(
                    member_no,
                    from = %format!("{} {}", current.first_name, current.last_name),
                    to = %member.display_name(),
                    "updating person name"
                );
                let request = PersonRequest {
                    first_name: member.first_name().to_string(),
                    last_name: member.last_name().to_string(),
                    secondary_identification: current.secondary_identification.clone(),
                };
                let mut staged = current.clone();
                staged.first_name = request.first_name.clone();
                staged.last_name = request.last_name.clone();
                cache.stage_person(member_no, staged);
                if !options.dry_run {
                    let updated = self.access.update_person(current.id, &request).await?;
                    cache.stage_person(member_no, updated);
                    cache.commit_person(member_no);
                }
                report.persons_updated += 1;
            }
        }

        if options.delete_persons {
            for &member_no in &plan.to_delete {
                let Some(person) = cache.person(member_no).cloned() else {
                    continue;
                };
                info!(member_no, "deleting person record");
                if !options.dry_run {
                    self.access.delete_person(person.id).await?;
                }
                cache.remove_person(member_no);
                report.persons_deleted += 1;
            }
        }

        Ok(())
    }

    // ── Phones ───────────────────────────────────────────────────────

    async fn sync_phones(
        &self,
        roster: &Roster,
        cache: &mut RemoteCache,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> EngineResult<()> {
        let plan = plan::plan_phones(roster, cache);
        debug!(
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            "phone plan computed"
        );

        for &member_no in &plan.missing_number {
            warn!(
                member_no,
                "member has no contact phone number; leaving them unprovisioned this run"
            );
        }

        if options.create_phones {
            for &member_no in &plan.to_create {
                let Some(number) = roster
                    .member(member_no)
                    .and_then(|m| m.contact_mobile_phone.clone())
                else {
                    continue;
                };
                let Some(owner) = cache.person(member_no).cloned() else {
                    warn!(
                        member_no,
                        "no person record to attach the phone to; skipping phone creation"
                    );
                    continue;
                };
                info!(member_no, number = %number, "creating phone medium");
                let request = PhoneRequest {
                    phone_number: number.clone(),
                };
                // The create response carries the new medium id; assignment
                // needs it, so it is captured rather than re-fetching the
                // whole phone table.
                let created = if options.dry_run {
                    None
                } else {
                    Some(self.access.create_phone(&request).await?)
                };
                info!(member_no, "assigning phone medium to its owner");
                match created {
                    Some(mut medium) => {
                        self.access.assign_phone(medium.id, owner.id).await?;
                        medium.person_id = Some(owner.id);
                        cache.stage_phone(member_no, medium);
                        cache.commit_phone(member_no);
                    }
                    None => {
                        cache.stage_phone(
                            member_no,
                            PhoneMedium {
                                id: 0,
                                person_id: Some(owner.id),
                                phone_number: Some(number),
                                pairing_code_valid_until: None,
                                device_identifier: None,
                            },
                        );
                    }
                }
                report.phones_created += 1;
            }
        }

        if options.update_phones {
            for &member_no in &plan.to_update {
                let (Some(number), Some(current)) = (
                    roster
                        .member(member_no)
                        .and_then(|m| m.contact_mobile_phone.clone()),
                    cache.phone(member_no).cloned(),
                ) else {
                    continue;
                };
                info!(
                    member_no,
                    from = %current.phone_number.as_deref().unwrap_or("-"),
                    to = %number,
                    "updating phone number"
                );
                let mut staged = current.clone();
                staged.phone_number = Some(number.clone());
                cache.stage_phone(member_no, staged);
                if !options.dry_run {
                    let updated = self
                        .access
                        .update_phone(current.id, &PhoneRequest {
                            phone_number: number,
                        })
                        .await?;
                    cache.stage_phone(member_no, updated);
                    cache.commit_phone(member_no);
                }
                report.phones_updated += 1;
            }
        }

        if options.delete_phones {
            for &member_no in &plan.to_delete {
                let Some(phone) = cache.phone(member_no).cloned() else {
                    continue;
                };
                info!(member_no, "deleting phone medium");
                if !options.dry_run {
                    self.access.delete_phone(phone.id).await?;
                }
                cache.remove_phone(member_no);
                report.phones_deleted += 1;
            }
        }

        Ok(())
    }

    /// Delete unassigned phones found at load time.  Routine cleanup, not
    /// tied to any toggle: an orphan can never correlate to a member, and
    /// it must be gone before the authorization pass runs.
    async fn cleanup_orphan_phones(
        &self,
        cache: &mut RemoteCache,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> EngineResult<()> {
        for phone in cache.take_orphan_phones() {
            info!(phone_id = phone.id, "deleting orphaned phone medium");
            if !options.dry_run {
                self.access.delete_phone(phone.id).await?;
            }
            report.orphan_phones_deleted += 1;
        }
        Ok(())
    }

    // ── Authorizations ───────────────────────────────────────────────

    async fn sync_authorizations(
        &self,
        roster: &Roster,
        cache: &mut RemoteCache,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> EngineResult<()> {
        let plan = plan::plan_authorizations(roster, cache, &options.area_ids);
        debug!(
            create = plan.to_create.len(),
            deferred = plan.deferred.len(),
            deauthorize = plan.to_deauthorize.len(),
            "authorization plan computed"
        );

        for &member_no in &plan.deferred {
            info!(
                member_no,
                "member does not own a phone medium yet; deferring authorization"
            );
            report.authorizations_deferred += 1;
        }

        for &(member_no, area_id) in &plan.to_create {
            let Some(person) = cache.person(member_no).cloned() else {
                warn!(member_no, "no person record for authorization; skipping");
                continue;
            };
            info!(member_no, area_id, "creating area authorization");
            if !options.dry_run {
                self.access.create_authorization(person.id, area_id).await?;
            }
            report.authorizations_created += 1;
        }

        if options.deauthorize {
            for (member_no, authorization_ids) in &plan.to_deauthorize {
                info!(
                    member_no,
                    authorizations = authorization_ids.len(),
                    "requesting deauthorization"
                );
                if !options.dry_run {
                    self.access
                        .request_authorization_deletion(authorization_ids)
                        .await?;
                }
                cache.mark_authorizations_deletion_requested(*member_no);
                report.members_deauthorized += 1;
            }
        }

        Ok(())
    }
}
