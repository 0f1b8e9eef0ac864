//! Per-product price history: the latest reading plus an append-only,
//! change-only history, persisted behind [`repository::ProductRepository`].

pub mod db;
pub mod errors;
pub mod locks;
pub mod memory;
pub mod model;
pub mod repository;
pub mod repository_sqlx;
pub mod store;

pub use errors::StoreError;
pub use model::{PricePoint, Product};
pub use repository::ProductRepository;
pub use store::PriceHistoryStore;
