//! Restaurants and the tables they offer for reservation.

mod service;

pub use service::{CatalogService, CreateTable, MAX_SEATS_PER_TABLE};
