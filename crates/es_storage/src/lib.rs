//! # es_storage
//!
//! A packed, type-erased entity/component store.
//!
//! Component types are registered at runtime against a [`Storage`] and
//! receive positional ids. Every entity owns a single [`EntityRecord`]
//! whose buffer holds its present components contiguously in ascending id
//! order; offsets are never stored but derived from the presence mask
//! through the [`OffsetCache`].
//!
//! - [`Storage`]: registry, entity lifecycle, field access, change
//!   tracking.
//! - [`iter`]: `for_each` batch iteration with per-component change
//!   reporting.
//! - [`serialize`]: the binary record format.
//! - [`StorageConfig`]: offset cache window and capacity tuning.
//!
//! The store is single-threaded; `Storage` is neither `Send` nor `Sync`.

pub mod config;
pub mod error;
pub mod hooks;
pub mod iter;
pub mod layout;
pub mod record;
pub mod serialize;
pub mod storage;

pub use config::StorageConfig;
pub use error::{Result, StorageError};
pub use hooks::EntityHook;
pub use iter::{Changed, Visit};
pub use layout::{DEFAULT_CACHE_WINDOW, MAX_CACHE_WINDOW, OffsetCache};
pub use record::{EntityRecord, PayloadSlab};
pub use storage::Storage;

pub use es_component::{
    BoxedComponent, BoxedOps, ComponentDescriptor, ComponentError, ComponentId, ComponentKind,
    ComponentMask, Entity, EntityRange,
};
