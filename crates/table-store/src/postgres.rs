use async_trait::async_trait;
use common::{ProfileId, ReservationId, RestaurantId, TableId};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, error::ErrorKind, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Restaurant, Result, StoreError, Table, TableFilter, UserReservation, UserReservationCanceled,
    store::{ReservationStore, StoreTransaction},
};

const TABLE_COLUMNS: &str = "id, restaurant_id, name, num_seats_available, num_seats_reserved, start_date, created_at, updated_at";
const RESERVATION_COLUMNS: &str =
    "id, restaurant_id, table_id, profile_id, num_seats, start_date, created_at, updated_at";

/// PostgreSQL-backed reservation store implementation.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Creates a new PostgreSQL reservation store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

fn row_to_restaurant(row: PgRow) -> Result<Restaurant> {
    Ok(Restaurant {
        id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_table(row: PgRow) -> Result<Table> {
    Ok(Table {
        id: TableId::from_uuid(row.try_get::<Uuid, _>("id")?),
        restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
        name: row.try_get("name")?,
        num_seats_available: row.try_get("num_seats_available")?,
        num_seats_reserved: row.try_get("num_seats_reserved")?,
        start_date: row.try_get("start_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_reservation(row: PgRow) -> Result<UserReservation> {
    Ok(UserReservation {
        id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
        table_id: TableId::from_uuid(row.try_get::<Uuid, _>("table_id")?),
        profile_id: ProfileId::from_uuid(row.try_get::<Uuid, _>("profile_id")?),
        num_seats: row.try_get("num_seats")?,
        start_date: row.try_get("start_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_canceled(row: PgRow) -> Result<UserReservationCanceled> {
    let r = row_to_reservation(row)?;
    Ok(UserReservationCanceled {
        id: r.id,
        restaurant_id: r.restaurant_id,
        table_id: r.table_id,
        profile_id: r.profile_id,
        num_seats: r.num_seats,
        start_date: r.start_date,
        created_at: r.created_at,
        updated_at: r.updated_at,
    })
}

/// Translates constraint failures into store error kinds.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                return StoreError::Conflict(db_err.message().to_string());
            }
            ErrorKind::CheckViolation | ErrorKind::ForeignKeyViolation => {
                return StoreError::ConstraintViolation(db_err.message().to_string());
            }
            _ => {}
        }
    }
    tracing::debug!(error = %e, "database statement failed");
    StoreError::Database(e)
}

async fn select_table(
    conn: &mut PgConnection,
    restaurant_id: RestaurantId,
    table_id: TableId,
    lock: bool,
) -> Result<Option<Table>> {
    let sql = format!(
        "SELECT {TABLE_COLUMNS} FROM tables WHERE restaurant_id = $1 AND id = $2{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(restaurant_id.as_uuid())
        .bind(table_id.as_uuid())
        .fetch_optional(conn)
        .await?;

    row.map(row_to_table).transpose()
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn fetch_table(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Option<Table>> {
        let mut conn = self.pool.acquire().await?;
        select_table(&mut conn, restaurant_id, table_id, false).await
    }

    async fn fetch_user_reservation(&self, id: ReservationId) -> Result<Option<UserReservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM user_reservations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_reservation).transpose()
    }

    async fn fetch_user_reservation_canceled(
        &self,
        id: ReservationId,
    ) -> Result<Option<UserReservationCanceled>> {
        let sql =
            format!("SELECT {RESERVATION_COLUMNS} FROM user_reservations_canceled WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_canceled).transpose()
    }

    async fn create_restaurant(&self, restaurant: Restaurant) -> Result<Restaurant> {
        let row = sqlx::query(
            r#"
            INSERT INTO restaurants (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(restaurant.id.as_uuid())
        .bind(&restaurant.name)
        .bind(restaurant.created_at)
        .bind(restaurant.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        row_to_restaurant(row)
    }

    async fn fetch_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, created_at, updated_at
            FROM restaurants
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_restaurant).transpose()
    }

    async fn create_table(&self, table: Table) -> Result<Table> {
        let sql = format!(
            r#"
            INSERT INTO tables ({TABLE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TABLE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(table.id.as_uuid())
            .bind(table.restaurant_id.as_uuid())
            .bind(&table.name)
            .bind(table.num_seats_available)
            .bind(table.num_seats_reserved)
            .bind(table.start_date)
            .bind(table.created_at)
            .bind(table.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        row_to_table(row)
    }

    async fn fetch_tables(
        &self,
        restaurant_id: RestaurantId,
        filter: TableFilter,
    ) -> Result<Vec<Table>> {
        let mut sql = format!("SELECT {TABLE_COLUMNS} FROM tables WHERE restaurant_id = $1");
        let mut param_count = 1;

        if filter.starts_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND start_date >= ${param_count}"));
        }
        if filter.starts_before.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND start_date < ${param_count}"));
        }
        if filter.with_free_seats {
            sql.push_str(" AND num_seats_reserved < num_seats_available");
        }

        sql.push_str(" ORDER BY start_date ASC, id ASC");

        if filter.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut query = sqlx::query(&sql).bind(restaurant_id.as_uuid());
        if let Some(from) = filter.starts_from {
            query = query.bind(from);
        }
        if let Some(before) = filter.starts_before {
            query = query.bind(before);
        }
        if let Some(limit) = filter.limit {
            // LIMIT must not be negative; anything past i64::MAX means no limit.
            query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_table).collect()
    }
}

/// A Postgres transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn fetch_table_for_update(
        &mut self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Option<Table>> {
        select_table(&mut self.tx, restaurant_id, table_id, true).await
    }

    async fn fetch_user_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<UserReservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM user_reservations WHERE id = $1 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(row_to_reservation).transpose()
    }

    async fn create_user_reservation(
        &mut self,
        reservation: UserReservation,
    ) -> Result<UserReservation> {
        let sql = format!(
            r#"
            INSERT INTO user_reservations ({RESERVATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(reservation.id.as_uuid())
            .bind(reservation.restaurant_id.as_uuid())
            .bind(reservation.table_id.as_uuid())
            .bind(reservation.profile_id.as_uuid())
            .bind(reservation.num_seats)
            .bind(reservation.start_date)
            .bind(reservation.created_at)
            .bind(reservation.updated_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

        row_to_reservation(row)
    }

    async fn delete_user_reservation(&mut self, id: ReservationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_reservations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_user_reservation_canceled(
        &mut self,
        canceled: UserReservationCanceled,
    ) -> Result<UserReservationCanceled> {
        let sql = format!(
            r#"
            INSERT INTO user_reservations_canceled ({RESERVATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(canceled.id.as_uuid())
            .bind(canceled.restaurant_id.as_uuid())
            .bind(canceled.table_id.as_uuid())
            .bind(canceled.profile_id.as_uuid())
            .bind(canceled.num_seats)
            .bind(canceled.start_date)
            .bind(canceled.created_at)
            .bind(canceled.updated_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

        row_to_canceled(row)
    }

    async fn update_table(&mut self, table: Table) -> Result<Table> {
        let sql = format!(
            r#"
            UPDATE tables
            SET num_seats_available = $3, num_seats_reserved = $4, updated_at = $5
            WHERE restaurant_id = $1 AND id = $2
            RETURNING {TABLE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(table.restaurant_id.as_uuid())
            .bind(table.id.as_uuid())
            .bind(table.num_seats_available)
            .bind(table.num_seats_reserved)
            .bind(table.updated_at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

        match row {
            Some(row) => row_to_table(row),
            None => Err(StoreError::missing("table", table.id)),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }
}
