//! Static object store definitions
//!
//! The physical schema is declared once here and applied idempotently by
//! [`crate::engine::StoreEngine::open`]. Definitions are additive across
//! versions: a new index field lands as a new entry in an existing
//! definition together with a `SCHEMA_VERSION` bump.

/// Version applied via `PRAGMA user_version`. Bump when a definition gains a
/// store or an index; never remove entries.
pub const SCHEMA_VERSION: i32 = 1;

pub const STORE_PROMPT_JOBS: &str = "prompt_jobs";
pub const STORE_GENERATED_IMAGES: &str = "generated_images";

pub const INDEX_STATUS: &str = "status";
pub const INDEX_CREATED_AT: &str = "created_at";
pub const INDEX_UPDATED_AT: &str = "updated_at";
pub const INDEX_JOB_ID: &str = "job_id";

/// A static schema entry: store name, unique key path, and the set of
/// non-unique secondary index fields extracted from each record document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStoreDefinition {
    pub name: &'static str,
    pub key_path: &'static str,
    pub indexes: &'static [&'static str],
}

pub const OBJECT_STORES: &[ObjectStoreDefinition] = &[
    ObjectStoreDefinition {
        name: STORE_PROMPT_JOBS,
        key_path: "id",
        indexes: &[INDEX_STATUS, INDEX_CREATED_AT, INDEX_UPDATED_AT],
    },
    ObjectStoreDefinition {
        name: STORE_GENERATED_IMAGES,
        key_path: "id",
        indexes: &[INDEX_JOB_ID, INDEX_CREATED_AT],
    },
];

/// Look up the definition for a store name.
pub fn definition(store: &str) -> Option<&'static ObjectStoreDefinition> {
    OBJECT_STORES.iter().find(|def| def.name == store)
}
