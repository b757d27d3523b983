//! In-memory fakes of the directory and access-control collaborators.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use keysync_access::{
    AccessApi, AccessPerson, AccessResult, AreaAuthorization, AuthorizationState, PersonRequest,
    PhoneMedium, PhoneRequest,
};
use keysync_directory::models::MemberRoles;
use keysync_directory::{DirectoryResult, DirectorySource, Member, MemberList};

pub fn member(member_no: i64, first: &str, last: &str, phone: Option<&str>) -> Member {
    Member {
        member_no,
        first_name: Some(first.into()),
        last_name: Some(last.into()),
        contact_mobile_phone: phone.map(Into::into),
        roles: MemberRoles::default(),
    }
}

/// Directory fake: a fixed member map plus one key-holder list.
pub struct FakeDirectory {
    members: HashMap<i64, Member>,
    keyholder_list: MemberList,
}

impl FakeDirectory {
    /// `keyholders` must be a subset of `members` by member number.
    pub fn new(members: Vec<Member>, keyholders: &[i64]) -> Self {
        let members: HashMap<i64, Member> =
            members.into_iter().map(|m| (m.member_no, m)).collect();
        let keyholder_list = MemberList {
            title: "Key holders".into(),
            aliases: ["keyholders".to_string()].into(),
            members: keyholders
                .iter()
                .filter_map(|no| members.get(no).map(|m| (*no, m.clone())))
                .collect(),
        };
        Self {
            members,
            keyholder_list,
        }
    }
}

#[async_trait]
impl DirectorySource for FakeDirectory {
    async fn all_members(&self) -> DirectoryResult<HashMap<i64, Member>> {
        Ok(self.members.clone())
    }

    async fn all_lists(
        &self,
        _fetch_members: bool,
        _list_ids: Option<&BTreeSet<i64>>,
    ) -> DirectoryResult<HashMap<i64, MemberList>> {
        Ok([(1, self.keyholder_list.clone())].into())
    }
}

/// Mutable state behind the access-control fake.
#[derive(Debug, Default)]
pub struct AccessState {
    pub persons: Vec<AccessPerson>,
    pub phones: Vec<PhoneMedium>,
    pub authorizations: Vec<AreaAuthorization>,
    pub next_id: i64,
    /// Total mutation calls observed (creates, updates, deletes, assigns).
    pub mutations: usize,
    pub pairing_codes_generated: Vec<i64>,
    pub registration_codes_sent: Vec<i64>,
}

impl AccessState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Access-control fake applying mutations to in-memory state, so a second
/// reconciliation run observes the converged result.
#[derive(Clone, Default)]
pub struct FakeAccess {
    state: Arc<Mutex<AccessState>>,
}

impl FakeAccess {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AccessState {
                next_id: 1000,
                ..AccessState::default()
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, AccessState> {
        self.state.lock().expect("access state lock")
    }

    pub fn add_person(&self, first: &str, last: &str, secondary: Option<&str>) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.persons.push(AccessPerson {
            id,
            first_name: first.into(),
            last_name: last.into(),
            secondary_identification: secondary.map(Into::into),
        });
        id
    }

    pub fn add_phone(&self, person_id: Option<i64>, number: Option<&str>) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.phones.push(PhoneMedium {
            id,
            person_id,
            phone_number: number.map(Into::into),
            pairing_code_valid_until: None,
            device_identifier: None,
        });
        id
    }

    pub fn add_pending_phone(&self, person_id: Option<i64>, number: Option<&str>) -> i64 {
        let id = self.add_phone(person_id, number);
        let mut state = self.state();
        if let Some(phone) = state.phones.iter_mut().find(|p| p.id == id) {
            phone.pairing_code_valid_until = Some(Utc::now() + Duration::hours(12));
        }
        id
    }

    pub fn add_registered_phone(&self, person_id: Option<i64>, number: Option<&str>) -> i64 {
        let id = self.add_phone(person_id, number);
        let mut state = self.state();
        if let Some(phone) = state.phones.iter_mut().find(|p| p.id == id) {
            phone.device_identifier = Some(format!("device-{id}"));
        }
        id
    }

    pub fn add_authorization(&self, person_id: i64, area_id: i64) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.authorizations.push(AreaAuthorization {
            id,
            person_id,
            area_id,
            state: AuthorizationState::Active,
        });
        id
    }
}

fn page<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl AccessApi for FakeAccess {
    async fn list_persons(&self, offset: usize, limit: usize) -> AccessResult<Vec<AccessPerson>> {
        Ok(page(&self.state().persons, offset, limit))
    }

    async fn create_person(&self, request: &PersonRequest) -> AccessResult<AccessPerson> {
        let mut state = self.state();
        let id = state.next_id();
        let person = AccessPerson {
            id,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            secondary_identification: request.secondary_identification.clone(),
        };
        state.persons.push(person.clone());
        state.mutations += 1;
        Ok(person)
    }

    async fn update_person(&self, id: i64, request: &PersonRequest) -> AccessResult<AccessPerson> {
        let mut state = self.state();
        state.mutations += 1;
        let person = state
            .persons
            .iter_mut()
            .find(|p| p.id == id)
            .expect("update of unknown person");
        person.first_name = request.first_name.clone();
        person.last_name = request.last_name.clone();
        Ok(person.clone())
    }

    async fn delete_person(&self, id: i64) -> AccessResult<()> {
        let mut state = self.state();
        state.mutations += 1;
        state.persons.retain(|p| p.id != id);
        Ok(())
    }

    async fn list_phones(&self, offset: usize, limit: usize) -> AccessResult<Vec<PhoneMedium>> {
        Ok(page(&self.state().phones, offset, limit))
    }

    async fn create_phone(&self, request: &PhoneRequest) -> AccessResult<PhoneMedium> {
        let mut state = self.state();
        let id = state.next_id();
        let phone = PhoneMedium {
            id,
            person_id: None,
            phone_number: Some(request.phone_number.clone()),
            pairing_code_valid_until: None,
            device_identifier: None,
        };
        state.phones.push(phone.clone());
        state.mutations += 1;
        Ok(phone)
    }

    async fn update_phone(&self, id: i64, request: &PhoneRequest) -> AccessResult<PhoneMedium> {
        let mut state = self.state();
        state.mutations += 1;
        let phone = state
            .phones
            .iter_mut()
            .find(|p| p.id == id)
            .expect("update of unknown phone");
        phone.phone_number = Some(request.phone_number.clone());
        Ok(phone.clone())
    }

    async fn delete_phone(&self, id: i64) -> AccessResult<()> {
        let mut state = self.state();
        state.mutations += 1;
        state.phones.retain(|p| p.id != id);
        Ok(())
    }

    async fn assign_phone(&self, phone_id: i64, person_id: i64) -> AccessResult<()> {
        let mut state = self.state();
        state.mutations += 1;
        let phone = state
            .phones
            .iter_mut()
            .find(|p| p.id == phone_id)
            .expect("assignment of unknown phone");
        phone.person_id = Some(person_id);
        Ok(())
    }

    async fn list_authorizations(
        &self,
        offset: usize,
        limit: usize,
    ) -> AccessResult<Vec<AreaAuthorization>> {
        Ok(page(&self.state().authorizations, offset, limit))
    }

    async fn create_authorization(
        &self,
        person_id: i64,
        area_id: i64,
    ) -> AccessResult<AreaAuthorization> {
        let mut state = self.state();
        let id = state.next_id();
        let authorization = AreaAuthorization {
            id,
            person_id,
            area_id,
            state: AuthorizationState::Active,
        };
        state.authorizations.push(authorization.clone());
        state.mutations += 1;
        Ok(authorization)
    }

    async fn request_authorization_deletion(&self, authorization_ids: &[i64]) -> AccessResult<()> {
        let mut state = self.state();
        state.mutations += 1;
        for authorization in state
            .authorizations
            .iter_mut()
            .filter(|a| authorization_ids.contains(&a.id))
        {
            authorization.state = AuthorizationState::DeletionRequested;
        }
        Ok(())
    }

    async fn generate_pairing_code(&self, phone_id: i64) -> AccessResult<PhoneMedium> {
        let mut state = self.state();
        state.pairing_codes_generated.push(phone_id);
        let phone = state
            .phones
            .iter_mut()
            .find(|p| p.id == phone_id)
            .expect("pairing for unknown phone");
        phone.pairing_code_valid_until = Some(Utc::now() + Duration::hours(24));
        Ok(phone.clone())
    }

    async fn send_registration_code(&self, phone_id: i64) -> AccessResult<()> {
        self.state().registration_codes_sent.push(phone_id);
        Ok(())
    }
}
