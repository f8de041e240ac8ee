use async_trait::async_trait;
use common::{ReservationId, RestaurantId, TableId};

use crate::{
    Restaurant, Result, Table, TableFilter, UserReservation, UserReservationCanceled,
};

/// Persistence boundary for tables, reservations, and cancellations.
///
/// Reads on the store itself see only committed data. Anything that
/// mutates seat counters goes through a [`StoreTransaction`] obtained from
/// [`ReservationStore::begin`]. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Starts a unit of work.
    ///
    /// The returned transaction must be committed explicitly; dropping it
    /// rolls back every write made through it.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Fetches a table by restaurant and table ID.
    async fn fetch_table(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Option<Table>>;

    /// Fetches an active reservation.
    async fn fetch_user_reservation(&self, id: ReservationId) -> Result<Option<UserReservation>>;

    /// Fetches the cancellation record archived for a reservation.
    async fn fetch_user_reservation_canceled(
        &self,
        id: ReservationId,
    ) -> Result<Option<UserReservationCanceled>>;

    /// Persists a new restaurant.
    async fn create_restaurant(&self, restaurant: Restaurant) -> Result<Restaurant>;

    /// Fetches a restaurant by ID.
    async fn fetch_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>>;

    /// Persists a new table. The restaurant must already exist.
    async fn create_table(&self, table: Table) -> Result<Table>;

    /// Lists a restaurant's tables matching `filter`.
    ///
    /// Tables are returned ordered by start date, then ID.
    async fn fetch_tables(
        &self,
        restaurant_id: RestaurantId,
        filter: TableFilter,
    ) -> Result<Vec<Table>>;
}

/// An open unit of work against a [`ReservationStore`].
///
/// Writes become visible to other readers only after [`commit`]. Dropping
/// the transaction without committing rolls it back.
///
/// [`commit`]: StoreTransaction::commit
#[async_trait]
pub trait StoreTransaction: Send {
    /// Fetches a table and locks it until the transaction ends.
    ///
    /// Concurrent transactions calling this for the same table are
    /// serialized, so a read-check-write on the seat counters cannot
    /// interleave with another one.
    async fn fetch_table_for_update(
        &mut self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Option<Table>>;

    /// Fetches an active reservation and locks it until the transaction ends.
    async fn fetch_user_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<UserReservation>>;

    /// Inserts a new active reservation.
    async fn create_user_reservation(
        &mut self,
        reservation: UserReservation,
    ) -> Result<UserReservation>;

    /// Deletes an active reservation.
    ///
    /// Returns false if no row was deleted.
    async fn delete_user_reservation(&mut self, id: ReservationId) -> Result<bool>;

    /// Inserts a cancellation record.
    async fn create_user_reservation_canceled(
        &mut self,
        canceled: UserReservationCanceled,
    ) -> Result<UserReservationCanceled>;

    /// Writes a table's seat counters and `updated_at`.
    async fn update_table(&mut self, table: Table) -> Result<Table>;

    /// Commits every write made through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}
