//! Keyed reactive state store.
//!
//! Typed key definitions name storage locations; resolvers bind them to a
//! scope (a specific user, the active user, the process, or a derived view)
//! and hand out live handles. All handles for the same (key, scope) pair
//! share one underlying node, so an update through any handle is observed by
//! every subscriber. The [`provider::StateProvider`] façade is the single
//! entry point for domain services.

pub mod account;
mod cache;
pub mod definition;
pub mod errors;
pub mod handle;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod storage;

pub use account::AccountService;
pub use definition::{KeyDefinition, StateDefinition, StorageLocation};
pub use errors::StateError;
pub use handle::{KeyedState, StateSubscription};
pub use provider::StateProvider;
pub use providers::{
    ActiveUserStateProvider, DeriveDefinition, DerivedState, DerivedStateProvider,
    DerivedSubscription, GlobalStateProvider, SingleUserStateProvider,
};
pub use registry::KeyRegistry;
pub use storage::{CompositeKey, FileStorage, MemoryStorage, Scope, StateStorage, StorageUpdate};
