//! Domain service layer on top of the keyed reactive state store.
//! - Maps persisted records to read-only domain views and back.
//! - Keeps update paths (`upsert`/`replace`) isolated from the read surface.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod organization;
