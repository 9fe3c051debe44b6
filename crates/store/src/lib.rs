//! Atelier object store engine
//!
//! A generic, store-agnostic persistence primitive over a local SQLite file.
//! Each object store is one table holding JSON record documents keyed by the
//! store's key path, with one extracted column per secondary index field.
//! Schema upgrades are additive-only: missing stores and missing indexes are
//! created, existing ones are never touched.

pub mod engine;
pub mod error;
pub mod schema;

pub use engine::{IndexValue, StorageEstimate, StoreEngine, StoreInfo};
pub use error::{Result, StoreError};
pub use schema::{
    definition, ObjectStoreDefinition, INDEX_CREATED_AT, INDEX_JOB_ID, INDEX_STATUS,
    INDEX_UPDATED_AT, OBJECT_STORES, SCHEMA_VERSION, STORE_GENERATED_IMAGES, STORE_PROMPT_JOBS,
};
