use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::Table;

/// Builder for narrowing a restaurant's table listing.
///
/// Every criterion is bound as a query parameter by the Postgres store;
/// no criterion is ever spliced into SQL text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    /// Tables starting at or after this instant.
    pub starts_from: Option<DateTime<Utc>>,

    /// Tables starting strictly before this instant.
    pub starts_before: Option<DateTime<Utc>>,

    /// Only tables with at least one free seat.
    pub with_free_seats: bool,

    /// Maximum number of tables to return.
    pub limit: Option<usize>,
}

impl TableFilter {
    /// Creates a filter that matches every table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to tables whose start date falls on `date` (UTC).
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        let end = date
            .checked_add_days(Days::new(1))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        self.starts_from = start;
        self.starts_before = end;
        self
    }

    /// Restricts to tables that still have free seats.
    pub fn with_free_seats(mut self) -> Self {
        self.with_free_seats = true;
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `table` satisfies every criterion except `limit`.
    pub fn matches(&self, table: &Table) -> bool {
        if let Some(from) = self.starts_from
            && table.start_date < from
        {
            return false;
        }
        if let Some(before) = self.starts_before
            && table.start_date >= before
        {
            return false;
        }
        if self.with_free_seats && table.remaining_seats() <= 0 {
            return false;
        }
        true
    }
}
