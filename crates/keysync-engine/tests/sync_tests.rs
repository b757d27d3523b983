//! End-to-end reconciliation tests against in-memory collaborators.

mod helpers;

use helpers::{member, FakeAccess, FakeDirectory};
use keysync_access::AuthorizationState;
use keysync_engine::{HolderSelection, SyncOptions, SyncService};

fn holder_selection() -> HolderSelection {
    HolderSelection {
        aliases: ["keyholders".to_string()].into(),
        roles: Default::default(),
    }
}

fn service(directory: FakeDirectory, access: FakeAccess) -> SyncService {
    SyncService::new(Box::new(directory), Box::new(access), holder_selection())
}

fn options_with_area(area_id: i64) -> SyncOptions {
    SyncOptions {
        area_ids: vec![area_id],
        ..SyncOptions::default()
    }
}

#[tokio::test]
async fn provisions_a_new_keyholder_end_to_end() {
    let directory = FakeDirectory::new(
        vec![member(100, "Anna", "Svensson", Some("+46701112233"))],
        &[100],
    );
    let access = FakeAccess::new();
    let service = service(directory, access.clone());

    let report = service.sync(&options_with_area(7)).await.unwrap();

    assert_eq!(report.persons_created, 1);
    assert_eq!(report.phones_created, 1);
    assert_eq!(report.authorizations_created, 1);

    let state = access.state();
    assert_eq!(state.persons.len(), 1);
    assert_eq!(
        state.persons[0].secondary_identification.as_deref(),
        Some("100")
    );
    // The phone was assigned to the freshly created person in the same run.
    assert_eq!(state.phones.len(), 1);
    assert_eq!(state.phones[0].person_id, Some(state.persons[0].id));
    assert_eq!(state.phones[0].phone_number.as_deref(), Some("+46701112233"));
    // Authorization followed in the same run, for the configured area.
    assert_eq!(state.authorizations.len(), 1);
    assert_eq!(state.authorizations[0].area_id, 7);
    assert_eq!(state.authorizations[0].person_id, state.persons[0].id);
    // No pairing code is sent as part of a sync.
    assert!(state.registration_codes_sent.is_empty());
}

#[tokio::test]
async fn second_run_is_a_fixed_point() {
    let directory = FakeDirectory::new(
        vec![
            member(100, "Anna", "Svensson", Some("+46701112233")),
            member(200, "Bo", "Berg", Some("+46702223344")),
        ],
        &[100, 200],
    );
    let access = FakeAccess::new();
    let service = service(directory, access.clone());

    service.sync(&options_with_area(7)).await.unwrap();
    let mutations_after_first = access.state().mutations;

    let report = service.sync(&options_with_area(7)).await.unwrap();

    assert_eq!(report.persons_created, 0);
    assert_eq!(report.persons_updated, 0);
    assert_eq!(report.persons_deleted, 0);
    assert_eq!(report.phones_created, 0);
    assert_eq!(report.phones_updated, 0);
    assert_eq!(report.phones_deleted, 0);
    assert_eq!(report.authorizations_created, 0);
    assert_eq!(report.members_deauthorized, 0);
    assert_eq!(access.state().mutations, mutations_after_first);
}

#[tokio::test]
async fn dry_run_decides_like_a_live_run_but_writes_nothing() {
    let build = || {
        let directory = FakeDirectory::new(
            vec![
                member(100, "Anna", "Svensson", Some("+46701112233")),
                member(300, "Carl", "Ek", Some("+46703334455")),
            ],
            &[100],
        );
        let access = FakeAccess::new();
        // Member 300 is provisioned remotely but no longer a key-holder.
        let carl = access.add_person("Carl", "Ek", Some("300"));
        access.add_phone(Some(carl), Some("+46703334455"));
        access.add_authorization(carl, 7);
        (directory, access)
    };

    let (directory, live_access) = build();
    let live_report = service(directory, live_access.clone())
        .sync(&options_with_area(7))
        .await
        .unwrap();

    let (directory, dry_access) = build();
    let dry_report = service(directory, dry_access.clone())
        .sync(&SyncOptions {
            dry_run: true,
            ..options_with_area(7)
        })
        .await
        .unwrap();

    // Same decisions either way.
    assert_eq!(dry_report.persons_created, live_report.persons_created);
    assert_eq!(dry_report.persons_deleted, live_report.persons_deleted);
    assert_eq!(dry_report.phones_created, live_report.phones_created);
    assert_eq!(dry_report.phones_deleted, live_report.phones_deleted);
    assert_eq!(
        dry_report.authorizations_created,
        live_report.authorizations_created
    );
    assert_eq!(
        dry_report.members_deauthorized,
        live_report.members_deauthorized
    );

    // But the dry run never touched the remote system.
    assert_eq!(dry_access.state().mutations, 0);
    assert_eq!(dry_access.state().persons.len(), 1);
    assert!(live_access.state().mutations > 0);
}

#[tokio::test]
async fn departed_keyholder_is_fully_deprovisioned() {
    let directory = FakeDirectory::new(
        vec![
            member(100, "Anna", "Svensson", Some("+46701112233")),
            member(300, "Carl", "Ek", Some("+46703334455")),
        ],
        &[100],
    );
    let access = FakeAccess::new();
    let anna = access.add_person("Anna", "Svensson", Some("100"));
    access.add_phone(Some(anna), Some("+46701112233"));
    access.add_authorization(anna, 7);
    let carl = access.add_person("Carl", "Ek", Some("300"));
    access.add_phone(Some(carl), Some("+46703334455"));
    access.add_authorization(carl, 7);

    let service = service(directory, access.clone());
    let report = service.sync(&options_with_area(7)).await.unwrap();

    assert_eq!(report.persons_deleted, 1);
    assert_eq!(report.phones_deleted, 1);
    assert_eq!(report.members_deauthorized, 1);

    let state = access.state();
    assert!(state.persons.iter().all(|p| p.id != carl));
    assert!(state.phones.iter().all(|p| p.person_id != Some(carl)));
    let carls_auth = state
        .authorizations
        .iter()
        .find(|a| a.person_id == carl)
        .unwrap();
    assert_eq!(carls_auth.state, AuthorizationState::DeletionRequested);
    // Anna is untouched.
    assert!(state.persons.iter().any(|p| p.id == anna));
}

#[tokio::test]
async fn foreign_records_are_never_mutated() {
    let directory = FakeDirectory::new(
        vec![member(100, "Anna", "Svensson", Some("+46701112233"))],
        &[100],
    );
    let access = FakeAccess::new();
    // Hand-created records: no correlation field, or one that is garbage.
    let visitor = access.add_person("Visiting", "Caretaker", None);
    access.add_phone(Some(visitor), Some("+46700000001"));
    let oddball = access.add_person("Odd", "Ball", Some("badge-17"));
    access.add_authorization(visitor, 7);

    let service = service(directory, access.clone());
    service.sync(&options_with_area(7)).await.unwrap();

    let state = access.state();
    assert!(state.persons.iter().any(|p| p.id == visitor));
    assert!(state.persons.iter().any(|p| p.id == oddball));
    assert!(state.phones.iter().any(|p| p.person_id == Some(visitor)));
    // The foreign authorization was excluded from the index, not touched.
    assert!(state
        .authorizations
        .iter()
        .all(|a| a.state == AuthorizationState::Active));
}

#[tokio::test]
async fn orphan_phones_are_cleaned_up_regardless_of_toggles() {
    let directory = FakeDirectory::new(
        vec![member(100, "Anna", "Svensson", Some("+46701112233"))],
        &[100],
    );
    let access = FakeAccess::new();
    let orphan = access.add_phone(None, Some("+46709999999"));

    let service = service(directory, access.clone());
    let report = service
        .sync(&SyncOptions {
            delete_phones: false,
            ..options_with_area(7)
        })
        .await
        .unwrap();

    assert_eq!(report.orphan_phones_deleted, 1);
    assert!(access.state().phones.iter().all(|p| p.id != orphan));
}

#[tokio::test]
async fn member_without_number_is_deferred_not_failed() {
    let directory = FakeDirectory::new(vec![member(100, "Anna", "Svensson", None)], &[100]);
    let access = FakeAccess::new();

    let service = service(directory, access.clone());
    let report = service.sync(&options_with_area(7)).await.unwrap();

    // Person exists, but no phone and therefore no authorization yet.
    assert_eq!(report.persons_created, 1);
    assert_eq!(report.phones_created, 0);
    assert_eq!(report.authorizations_created, 0);
    assert_eq!(report.authorizations_deferred, 1);
}

#[tokio::test]
async fn name_change_updates_person_only() {
    let directory = FakeDirectory::new(
        vec![member(100, "Anna", "Svensson-Lind", Some("+46701112233"))],
        &[100],
    );
    let access = FakeAccess::new();
    let anna = access.add_person("Anna", "Svensson", Some("100"));
    access.add_phone(Some(anna), Some("+46701112233"));
    access.add_authorization(anna, 7);

    let service = service(directory, access.clone());
    let report = service.sync(&options_with_area(7)).await.unwrap();

    assert_eq!(report.persons_updated, 1);
    assert_eq!(report.phones_updated, 0);
    assert_eq!(
        access.state().persons[0].last_name,
        "Svensson-Lind".to_string()
    );
}

#[tokio::test]
async fn authorization_fans_out_across_areas() {
    let directory = FakeDirectory::new(
        vec![member(100, "Anna", "Svensson", Some("+46701112233"))],
        &[100],
    );
    let access = FakeAccess::new();

    let service = service(directory, access.clone());
    let report = service
        .sync(&SyncOptions {
            area_ids: vec![7, 8, 9],
            ..SyncOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(report.authorizations_created, 3);
    let state = access.state();
    let mut areas: Vec<i64> = state.authorizations.iter().map(|a| a.area_id).collect();
    areas.sort_unstable();
    assert_eq!(areas, vec![7, 8, 9]);
}

// ── Registration dispatch ───────────────────────────────────────────

#[tokio::test]
async fn send_limit_caps_actual_sends_only() {
    let directory = FakeDirectory::new(
        vec![
            member(100, "Anna", "Svensson", Some("+46701112233")),
            member(200, "Bo", "Berg", Some("+46702223344")),
            member(300, "Carl", "Ek", Some("+46703334455")),
        ],
        &[100, 200, 300],
    );
    let access = FakeAccess::new();
    for (no, number) in [(100, "+46701112233"), (200, "+46702223344"), (300, "+46703334455")] {
        let secondary = no.to_string();
        let person = access.add_person("P", "Q", Some(&secondary));
        access.add_phone(Some(person), Some(number));
    }

    let service = service(directory, access.clone());
    let sent = service.send_pending_registration_codes(Some(1)).await.unwrap();

    assert_eq!(sent, 1);
    assert_eq!(access.state().registration_codes_sent.len(), 1);
    assert_eq!(access.state().pairing_codes_generated.len(), 1);
}

#[tokio::test]
async fn pending_code_is_skipped_but_listed() {
    let directory = FakeDirectory::new(
        vec![
            member(100, "Anna", "Svensson", Some("+46701112233")),
            member(200, "Bo", "Berg", Some("+46702223344")),
        ],
        &[100, 200],
    );
    let access = FakeAccess::new();
    let anna = access.add_person("Anna", "Svensson", Some("100"));
    let anna_phone = access.add_pending_phone(Some(anna), Some("+46701112233"));
    let bo = access.add_person("Bo", "Berg", Some("200"));
    let bo_phone = access.add_phone(Some(bo), Some("+46702223344"));

    let service = service(directory, access.clone());

    // Anna's code is still valid: skipped without consuming the limit, so
    // the single allowed send goes to Bo.
    let sent = service.send_pending_registration_codes(Some(1)).await.unwrap();
    assert_eq!(sent, 1);
    assert_eq!(access.state().registration_codes_sent, vec![bo_phone]);

    let pending = service.list_pending_registration_codes().await.unwrap();
    let ids: Vec<i64> = pending.iter().map(|p| p.phone_id).collect();
    assert!(ids.contains(&anna_phone));
    assert!(ids.contains(&bo_phone));
    assert_eq!(pending.len(), 2);
    assert_eq!(
        pending.iter().find(|p| p.phone_id == anna_phone).unwrap().owner_display(),
        "Anna Svensson"
    );
}

#[tokio::test]
async fn registered_phones_get_no_codes_and_unowned_pending_is_anonymous() {
    let directory = FakeDirectory::new(
        vec![member(100, "Anna", "Svensson", Some("+46701112233"))],
        &[100],
    );
    let access = FakeAccess::new();
    let anna = access.add_person("Anna", "Svensson", Some("100"));
    access.add_registered_phone(Some(anna), Some("+46701112233"));
    let stray = access.add_pending_phone(None, Some("+46708887766"));

    let service = service(directory, access.clone());

    let sent = service.send_pending_registration_codes(None).await.unwrap();
    assert_eq!(sent, 0);

    let pending = service.list_pending_registration_codes().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].phone_id, stray);
    assert_eq!(pending[0].owner_display(), "anonymous");
}
