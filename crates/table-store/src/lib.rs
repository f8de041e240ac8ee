//! Transactional persistence for restaurant tables and their reservations.
//!
//! [`ReservationStore`] is the persistence boundary; seat counters are only
//! ever changed through a [`StoreTransaction`]. Two implementations are
//! provided: [`PostgresReservationStore`] and [`InMemoryReservationStore`].

pub mod error;
pub mod filter;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{ProfileId, ReservationId, RestaurantId, TableId};
pub use error::{Result, StoreError};
pub use filter::TableFilter;
pub use memory::InMemoryReservationStore;
pub use model::{Restaurant, Table, UserReservation, UserReservationCanceled};
pub use postgres::PostgresReservationStore;
pub use store::{ReservationStore, StoreTransaction};
