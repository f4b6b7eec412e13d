//! Mock storage implementations for testing.
//!
//! All stores share one [`MockDatabase`]. Every operation takes the single
//! table lock for its whole duration, which gives the in-memory backend the
//! same all-or-nothing behavior the SQLite backend gets from transactions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::helpers;
use super::{
    AssistanceLedger, CampStore, NeedStore, PledgeStore, ProfileStore, Result, StorageError,
    VolunteerStore,
};
use crate::model::{
    sort_by_urgency, Assistance, Camp, CampStatus, DeliveryStatus, NewAssistance, NewCamp,
    NewNeed, NewProfile, NewVolunteerRegistration, Need, NeedStatus, Pledge, PledgeReceipt,
    Profile, VolunteerRegistration,
};

/// Rows in insertion order.
#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    camps: Vec<Camp>,
    needs: Vec<Need>,
    ledger: Vec<Assistance>,
    volunteers: Vec<VolunteerRegistration>,
    /// Conditional writes still to fail with `Contention`.
    contention: u32,
    fail_on_write: bool,
}

impl Tables {
    /// Gate for every write. Consumes one injected contention failure if any
    /// are pending.
    fn check_write(&mut self) -> Result<()> {
        if self.fail_on_write {
            return Err(StorageError::Database("injected write failure".to_string()));
        }
        if self.contention > 0 {
            self.contention -= 1;
            return Err(StorageError::Contention(
                "injected concurrent writer".to_string(),
            ));
        }
        Ok(())
    }

    fn camp_mut(&mut self, camp_id: Uuid) -> Result<&mut Camp> {
        self.camps
            .iter_mut()
            .find(|c| c.id == camp_id)
            .ok_or_else(|| StorageError::not_found("camp", camp_id))
    }

    fn need_mut(&mut self, need_id: Uuid) -> Result<&mut Need> {
        self.needs
            .iter_mut()
            .find(|n| n.id == need_id)
            .ok_or_else(|| StorageError::not_found("need", need_id))
    }

    fn occupy_seat(&mut self, camp_id: Uuid) -> Result<Camp> {
        let camp = self.camp_mut(camp_id)?;
        let updated = helpers::occupy_seat(camp, helpers::now())?;
        *camp = updated.clone();
        Ok(updated)
    }

    fn free_seat(&mut self, camp_id: Uuid) -> Result<Camp> {
        let camp = self.camp_mut(camp_id)?;
        let updated = helpers::free_seat(camp, helpers::now())?;
        *camp = updated.clone();
        Ok(updated)
    }

    fn apply_fulfillment(&mut self, need_id: Uuid, delta: i64) -> Result<Need> {
        let need = self.need_mut(need_id)?;
        let updated = helpers::fulfill(need, delta, helpers::now())?;
        *need = updated.clone();
        Ok(updated)
    }

    fn append_entry(&mut self, entry: NewAssistance) -> Result<Assistance> {
        entry.validate()?;
        let created = Assistance {
            id: Uuid::new_v4(),
            ngo_id: entry.ngo_id,
            camp_id: entry.camp_id,
            need_id: entry.need_id,
            items_provided: entry.items_provided,
            quantity: entry.quantity,
            delivery_status: DeliveryStatus::Pledged,
            notes: entry.notes,
            created_at: helpers::now(),
        };
        self.ledger.push(created.clone());
        Ok(created)
    }

    fn entries_where(&self, pred: impl Fn(&Assistance) -> bool) -> Vec<Assistance> {
        let mut entries: Vec<_> = self.ledger.iter().rev().filter(|&e| pred(e)).cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}

/// Shared in-memory database.
#[derive(Default)]
pub struct MockDatabase {
    tables: Mutex<Tables>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes with `Contention`.
    pub async fn set_contention(&self, count: u32) {
        self.tables.lock().await.contention = count;
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        self.tables.lock().await.fail_on_write = fail;
    }

    pub async fn ledger_len(&self) -> usize {
        self.tables.lock().await.ledger.len()
    }
}

// ============================================================================
// Profiles
// ============================================================================

pub struct MockProfileStore {
    db: Arc<MockDatabase>,
}

impl MockProfileStore {
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn create(&self, profile: NewProfile) -> Result<Profile> {
        profile.validate()?;
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        if tables.profiles.iter().any(|p| p.id == profile.id) {
            return Err(StorageError::Duplicate(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        let created = Profile {
            id: profile.id,
            full_name: profile.full_name,
            phone: profile.phone,
            role: profile.role,
            created_at: helpers::now(),
        };
        tables.profiles.push(created.clone());
        Ok(created)
    }

    async fn get(&self, profile_id: Uuid) -> Result<Option<Profile>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.profiles.iter().find(|p| p.id == profile_id).cloned())
    }
}

// ============================================================================
// Camps
// ============================================================================

pub struct MockCampStore {
    db: Arc<MockDatabase>,
}

impl MockCampStore {
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CampStore for MockCampStore {
    async fn create(&self, camp: NewCamp) -> Result<Camp> {
        camp.validate()?;
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        let now = helpers::now();
        let created = Camp {
            id: Uuid::new_v4(),
            admin_id: camp.admin_id,
            name: camp.name,
            location: camp.location,
            latitude: camp.latitude,
            longitude: camp.longitude,
            total_capacity: camp.total_capacity,
            occupied_seats: 0,
            contact_phone: camp.contact_phone,
            contact_email: camp.contact_email,
            status: if camp.total_capacity == 0 {
                CampStatus::Full
            } else {
                CampStatus::Active
            },
            created_at: now,
            updated_at: now,
        };
        tables.camps.push(created.clone());
        Ok(created)
    }

    async fn get(&self, camp_id: Uuid) -> Result<Option<Camp>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.camps.iter().find(|c| c.id == camp_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Camp>> {
        let tables = self.db.tables.lock().await;
        let mut camps = tables.camps.clone();
        camps.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(camps)
    }

    async fn list_by_admin(&self, admin_id: Uuid) -> Result<Vec<Camp>> {
        let tables = self.db.tables.lock().await;
        let mut camps: Vec<_> = tables
            .camps
            .iter()
            .filter(|c| c.admin_id == admin_id)
            .cloned()
            .collect();
        camps.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(camps)
    }

    async fn update_status(&self, camp_id: Uuid, status: CampStatus) -> Result<Camp> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        let camp = tables.camp_mut(camp_id)?;
        let updated = helpers::set_camp_status(camp, status, helpers::now())?;
        *camp = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, camp_id: Uuid) -> Result<()> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        let before = tables.camps.len();
        tables.camps.retain(|c| c.id != camp_id);
        if tables.camps.len() == before {
            return Err(StorageError::not_found("camp", camp_id));
        }

        let removed_needs: Vec<Uuid> = tables
            .needs
            .iter()
            .filter(|n| n.camp_id == camp_id)
            .map(|n| n.id)
            .collect();
        tables.needs.retain(|n| n.camp_id != camp_id);
        tables.volunteers.retain(|v| v.camp_id != camp_id);
        for entry in tables.ledger.iter_mut() {
            if entry.need_id.is_some_and(|id| removed_needs.contains(&id)) {
                entry.need_id = None;
            }
        }
        Ok(())
    }

    async fn reserve_seat(&self, camp_id: Uuid) -> Result<Camp> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        tables.occupy_seat(camp_id)
    }

    async fn release_seat(&self, camp_id: Uuid) -> Result<Camp> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        tables.free_seat(camp_id)
    }
}

// ============================================================================
// Needs
// ============================================================================

pub struct MockNeedStore {
    db: Arc<MockDatabase>,
}

impl MockNeedStore {
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NeedStore for MockNeedStore {
    async fn create(&self, need: NewNeed) -> Result<Need> {
        need.validate()?;
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        if !tables.camps.iter().any(|c| c.id == need.camp_id) {
            return Err(StorageError::not_found("camp", need.camp_id));
        }
        let now = helpers::now();
        let created = Need {
            id: Uuid::new_v4(),
            camp_id: need.camp_id,
            item_name: need.item_name,
            quantity_needed: need.quantity_needed,
            quantity_fulfilled: 0,
            urgency: need.urgency,
            status: NeedStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.needs.push(created.clone());
        Ok(created)
    }

    async fn get(&self, need_id: Uuid) -> Result<Option<Need>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.needs.iter().find(|n| n.id == need_id).cloned())
    }

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Need>> {
        let tables = self.db.tables.lock().await;
        let mut needs: Vec<_> = tables
            .needs
            .iter()
            .filter(|n| n.camp_id == camp_id)
            .cloned()
            .collect();
        sort_by_urgency(&mut needs);
        Ok(needs)
    }

    async fn apply_fulfillment(&self, need_id: Uuid, delta: i64) -> Result<Need> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        tables.apply_fulfillment(need_id, delta)
    }
}

// ============================================================================
// Assistance ledger
// ============================================================================

pub struct MockAssistanceLedger {
    db: Arc<MockDatabase>,
}

impl MockAssistanceLedger {
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssistanceLedger for MockAssistanceLedger {
    async fn record(&self, entry: NewAssistance) -> Result<Assistance> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        tables.append_entry(entry)
    }

    async fn get(&self, entry_id: Uuid) -> Result<Option<Assistance>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.ledger.iter().find(|e| e.id == entry_id).cloned())
    }

    async fn list_by_need(&self, need_id: Uuid) -> Result<Vec<Assistance>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.entries_where(|e| e.need_id == Some(need_id)))
    }

    async fn list_by_ngo(&self, ngo_id: Uuid) -> Result<Vec<Assistance>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.entries_where(|e| e.ngo_id == ngo_id))
    }

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Assistance>> {
        let tables = self.db.tables.lock().await;
        Ok(tables.entries_where(|e| e.camp_id == camp_id))
    }

    async fn advance_delivery_status(
        &self,
        entry_id: Uuid,
        next: DeliveryStatus,
    ) -> Result<Assistance> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        let entry = tables
            .ledger
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| StorageError::not_found("assistance", entry_id))?;
        let updated = helpers::advance_delivery(entry, next)?;
        *entry = updated.clone();
        Ok(updated)
    }
}

// ============================================================================
// Pledges
// ============================================================================

pub struct MockPledgeStore {
    db: Arc<MockDatabase>,
}

impl MockPledgeStore {
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PledgeStore for MockPledgeStore {
    async fn commit_pledge(&self, pledge: Pledge) -> Result<PledgeReceipt> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;

        // Validate the ledger entry before touching the need so a rejected
        // pledge leaves both relations untouched.
        let current = tables
            .needs
            .iter()
            .find(|n| n.id == pledge.need_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("need", pledge.need_id))?;
        let entry = NewAssistance {
            ngo_id: pledge.ngo_id,
            camp_id: current.camp_id,
            need_id: Some(current.id),
            items_provided: current.item_name.clone(),
            quantity: pledge.quantity,
            notes: pledge.notes,
        };
        entry.validate()?;
        let need = tables.apply_fulfillment(pledge.need_id, pledge.quantity)?;
        let assistance = tables.append_entry(entry)?;
        Ok(PledgeReceipt { need, assistance })
    }
}

// ============================================================================
// Volunteers
// ============================================================================

pub struct MockVolunteerStore {
    db: Arc<MockDatabase>,
}

impl MockVolunteerStore {
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VolunteerStore for MockVolunteerStore {
    async fn register(
        &self,
        registration: NewVolunteerRegistration,
    ) -> Result<VolunteerRegistration> {
        registration.validate()?;
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        if tables.volunteers.iter().any(|v| {
            v.user_id == registration.user_id
                && v.camp_id == registration.camp_id
                && v.volunteer_type == registration.volunteer_type
        }) {
            return Err(StorageError::Duplicate(format!(
                "user {} already registered at camp {} as {}",
                registration.user_id, registration.camp_id, registration.volunteer_type
            )));
        }
        tables.occupy_seat(registration.camp_id)?;
        let created = VolunteerRegistration {
            id: Uuid::new_v4(),
            user_id: registration.user_id,
            camp_id: registration.camp_id,
            volunteer_type: registration.volunteer_type,
            created_at: helpers::now(),
        };
        tables.volunteers.push(created.clone());
        Ok(created)
    }

    async fn get(&self, registration_id: Uuid) -> Result<Option<VolunteerRegistration>> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .volunteers
            .iter()
            .find(|v| v.id == registration_id)
            .cloned())
    }

    async fn withdraw(&self, registration_id: Uuid) -> Result<VolunteerRegistration> {
        let mut tables = self.db.tables.lock().await;
        tables.check_write()?;
        let index = tables
            .volunteers
            .iter()
            .position(|v| v.id == registration_id)
            .ok_or_else(|| StorageError::not_found("volunteer registration", registration_id))?;
        let camp_id = tables.volunteers[index].camp_id;
        tables.free_seat(camp_id)?;
        Ok(tables.volunteers.remove(index))
    }

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<VolunteerRegistration>> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .volunteers
            .iter()
            .filter(|v| v.camp_id == camp_id)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<VolunteerRegistration>> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .volunteers
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }
}
