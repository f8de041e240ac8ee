use chrono::{DateTime, Utc};
use common::{RestaurantId, TableId};
use serde::Deserialize;
use table_store::{ReservationStore, Restaurant, Table, TableFilter};

use crate::Clock;
use crate::error::CatalogError;

/// Largest seat capacity a single table may be created with.
pub const MAX_SEATS_PER_TABLE: i32 = 4;

/// Input for creating a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTable {
    #[serde(default)]
    pub name: Option<String>,
    pub num_seats_available: i32,
    pub start_date: DateTime<Utc>,
}

/// Service for creating and looking up restaurants and tables.
pub struct CatalogService<S: ReservationStore> {
    store: S,
    clock: Clock,
}

impl<S: ReservationStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    /// Replaces the source of the current time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_restaurant(&self, name: &str) -> Result<Restaurant, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation(
                "restaurant name must not be empty".to_string(),
            ));
        }

        let restaurant = self
            .store
            .create_restaurant(Restaurant::new(name, (self.clock)()))
            .await?;

        tracing::info!(restaurant_id = %restaurant.id, "restaurant created");
        Ok(restaurant)
    }

    /// Adds a table to an existing restaurant.
    ///
    /// The table always starts with no seats reserved.
    #[tracing::instrument(skip(self, input), fields(seats = input.num_seats_available))]
    pub async fn create_table(
        &self,
        restaurant_id: RestaurantId,
        input: CreateTable,
    ) -> Result<Table, CatalogError> {
        if !(1..=MAX_SEATS_PER_TABLE).contains(&input.num_seats_available) {
            return Err(CatalogError::Validation(format!(
                "num_seats_available must be between 1 and {MAX_SEATS_PER_TABLE}, got {}",
                input.num_seats_available
            )));
        }

        self.fetch_restaurant(restaurant_id).await?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let table = self
            .store
            .create_table(Table::new(
                restaurant_id,
                name,
                input.num_seats_available,
                input.start_date,
                (self.clock)(),
            ))
            .await?;

        tracing::info!(table_id = %table.id, "table created");
        Ok(table)
    }

    pub async fn fetch_restaurant(&self, id: RestaurantId) -> Result<Restaurant, CatalogError> {
        self.store
            .fetch_restaurant(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("restaurant", id))
    }

    pub async fn fetch_table(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Table, CatalogError> {
        self.store
            .fetch_table(restaurant_id, table_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("table", table_id))
    }

    /// Lists a restaurant's tables matching `filter`, ordered by start
    /// date then ID.
    pub async fn fetch_tables(
        &self,
        restaurant_id: RestaurantId,
        filter: TableFilter,
    ) -> Result<Vec<Table>, CatalogError> {
        self.fetch_restaurant(restaurant_id).await?;
        Ok(self.store.fetch_tables(restaurant_id, filter).await?)
    }
}
