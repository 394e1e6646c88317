//! Domain records and views for the vault state layer.
//! - Records (`OrganizationData`) mirror the API response and are what gets
//!   persisted as JSON.
//! - Views (`Organization`) are read-only projections rebuilt on every read;
//!   they carry the derived permission booleans and own no storage.

pub mod errors;
pub mod organization;
pub mod capability;

pub use capability::Capability;
pub use organization::{Organization, OrganizationData};
