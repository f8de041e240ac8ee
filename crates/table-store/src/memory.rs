use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{ReservationId, RestaurantId, TableId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Restaurant, Result, StoreError, Table, TableFilter, UserReservation, UserReservationCanceled,
    store::{ReservationStore, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    restaurants: HashMap<RestaurantId, Restaurant>,
    tables: HashMap<TableId, Table>,
    reservations: HashMap<ReservationId, UserReservation>,
    canceled: HashMap<ReservationId, UserReservationCanceled>,
}

impl MemoryState {
    fn table(&self, restaurant_id: RestaurantId, table_id: TableId) -> Option<&Table> {
        self.tables
            .get(&table_id)
            .filter(|t| t.restaurant_id == restaurant_id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_update_table: AtomicBool,
    fail_on_commit: AtomicBool,
}

/// In-memory reservation store implementation for testing.
///
/// Writers are serialized: a transaction holds the store's write lock from
/// `begin` until it is committed or dropped, and stages its writes on a
/// private copy of the state that replaces the committed state on commit.
/// Committed reads never wait for a transaction.
///
/// A task holding an open transaction must not call the store's own write
/// methods (`create_restaurant`, `create_table`); they wait for the same lock.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    committed: Arc<RwLock<MemoryState>>,
    write_lock: Arc<Mutex<()>>,
    faults: Arc<Faults>,
}

impl InMemoryReservationStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `update_table` call fail.
    pub fn set_fail_on_update_table(&self, fail: bool) {
        self.faults.fail_on_update_table.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `commit` call fail.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.faults.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of active reservations.
    pub async fn reservation_count(&self) -> usize {
        self.committed.read().await.reservations.len()
    }

    /// Returns the number of cancellation records.
    pub async fn canceled_count(&self) -> usize {
        self.committed.read().await.canceled.len()
    }

    /// Returns every active reservation on a table.
    pub async fn reservations_for_table(&self, table_id: TableId) -> Vec<UserReservation> {
        self.committed
            .read()
            .await
            .reservations
            .values()
            .filter(|r| r.table_id == table_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.write_lock.clone().lock_owned().await;
        let working = self.committed.read().await.clone();

        Ok(Box::new(InMemoryTransaction {
            _guard: guard,
            working,
            committed: self.committed.clone(),
            faults: self.faults.clone(),
        }))
    }

    async fn fetch_table(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Option<Table>> {
        let state = self.committed.read().await;
        Ok(state.table(restaurant_id, table_id).cloned())
    }

    async fn fetch_user_reservation(&self, id: ReservationId) -> Result<Option<UserReservation>> {
        let state = self.committed.read().await;
        Ok(state.reservations.get(&id).cloned())
    }

    async fn fetch_user_reservation_canceled(
        &self,
        id: ReservationId,
    ) -> Result<Option<UserReservationCanceled>> {
        let state = self.committed.read().await;
        Ok(state.canceled.get(&id).cloned())
    }

    async fn create_restaurant(&self, restaurant: Restaurant) -> Result<Restaurant> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.committed.write().await;

        if state.restaurants.contains_key(&restaurant.id) {
            return Err(StoreError::Conflict(format!(
                "restaurant {} already exists",
                restaurant.id
            )));
        }
        state.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(restaurant)
    }

    async fn fetch_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        let state = self.committed.read().await;
        Ok(state.restaurants.get(&id).cloned())
    }

    async fn create_table(&self, table: Table) -> Result<Table> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.committed.write().await;

        if !state.restaurants.contains_key(&table.restaurant_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "restaurant {} does not exist",
                table.restaurant_id
            )));
        }
        if !table.is_consistent() {
            return Err(StoreError::ConstraintViolation(format!(
                "table {} seat counters out of bounds",
                table.id
            )));
        }
        if state.tables.contains_key(&table.id) {
            return Err(StoreError::Conflict(format!(
                "table {} already exists",
                table.id
            )));
        }
        state.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn fetch_tables(
        &self,
        restaurant_id: RestaurantId,
        filter: TableFilter,
    ) -> Result<Vec<Table>> {
        let state = self.committed.read().await;
        let mut tables: Vec<_> = state
            .tables
            .values()
            .filter(|t| t.restaurant_id == restaurant_id && filter.matches(t))
            .cloned()
            .collect();

        tables.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));

        if let Some(limit) = filter.limit {
            tables.truncate(limit);
        }
        Ok(tables)
    }
}

/// A staged unit of work against an [`InMemoryReservationStore`].
pub struct InMemoryTransaction {
    _guard: OwnedMutexGuard<()>,
    working: MemoryState,
    committed: Arc<RwLock<MemoryState>>,
    faults: Arc<Faults>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn fetch_table_for_update(
        &mut self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Option<Table>> {
        Ok(self.working.table(restaurant_id, table_id).cloned())
    }

    async fn fetch_user_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<UserReservation>> {
        Ok(self.working.reservations.get(&id).cloned())
    }

    async fn create_user_reservation(
        &mut self,
        reservation: UserReservation,
    ) -> Result<UserReservation> {
        if self.working.reservations.contains_key(&reservation.id) {
            return Err(StoreError::Conflict(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        if !self.working.tables.contains_key(&reservation.table_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "table {} does not exist",
                reservation.table_id
            )));
        }
        if reservation.num_seats <= 0 {
            return Err(StoreError::ConstraintViolation(format!(
                "reservation {} must hold at least one seat",
                reservation.id
            )));
        }
        self.working
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn delete_user_reservation(&mut self, id: ReservationId) -> Result<bool> {
        Ok(self.working.reservations.remove(&id).is_some())
    }

    async fn create_user_reservation_canceled(
        &mut self,
        canceled: UserReservationCanceled,
    ) -> Result<UserReservationCanceled> {
        if self.working.canceled.contains_key(&canceled.id) {
            return Err(StoreError::Conflict(format!(
                "reservation {} already canceled",
                canceled.id
            )));
        }
        self.working.canceled.insert(canceled.id, canceled.clone());
        Ok(canceled)
    }

    async fn update_table(&mut self, table: Table) -> Result<Table> {
        if self.faults.fail_on_update_table.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("update_table"));
        }
        if !table.is_consistent() {
            return Err(StoreError::ConstraintViolation(format!(
                "table {} seat counters out of bounds",
                table.id
            )));
        }

        let stored = self
            .working
            .tables
            .get_mut(&table.id)
            .filter(|t| t.restaurant_id == table.restaurant_id)
            .ok_or_else(|| StoreError::missing("table", table.id))?;

        stored.num_seats_available = table.num_seats_available;
        stored.num_seats_reserved = table.num_seats_reserved;
        stored.updated_at = table.updated_at;
        Ok(stored.clone())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.faults.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("commit"));
        }

        let InMemoryTransaction {
            _guard,
            working,
            committed,
            ..
        } = *self;
        *committed.write().await = working;
        Ok(())
    }
}
