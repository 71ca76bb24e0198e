//! Storage-layer error types.

use es_component::{ComponentError, ComponentId, Entity};

/// Errors returned by [`crate::Storage`] operations.
///
/// Every failing operation leaves the storage unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The entity does not exist.
    #[error("unknown entity {0}")]
    UnknownEntity(Entity),

    /// The entity exists but does not hold the component.
    #[error("{entity} has no component {component}")]
    ComponentMissing {
        /// Entity that was queried.
        entity: Entity,
        /// Component that was requested.
        component: ComponentId,
    },

    /// No component is registered under that name.
    #[error("no component named `{0}`")]
    NotFound(String),

    /// Every component id is already taken.
    #[error("component capacity exceeded: at most {limit} types per storage")]
    CapacityExceeded {
        /// Maximum number of component types.
        limit: usize,
    },

    /// A component with that name is already registered.
    #[error("a component named `{0}` is already registered")]
    DuplicateName(String),

    /// The id does not name a registered component.
    #[error("component {0} is not registered")]
    UnknownComponent(ComponentId),

    /// The requested Rust type does not match the registered one.
    #[error("component {component} holds `{expected}`, not `{actual}`")]
    TypeMismatch {
        /// Component that was accessed.
        component: ComponentId,
        /// Registered type name.
        expected: &'static str,
        /// Requested type name.
        actual: &'static str,
    },

    /// Byte-level access was attempted on a boxed component.
    #[error("component {component} is boxed and has no byte representation")]
    NotFlat {
        /// Component that was accessed.
        component: ComponentId,
    },

    /// A boxed component without serialization hooks had to be persisted.
    #[error("component {component} has no serialization hooks")]
    SerializationNotImplemented {
        /// Component being encoded or decoded.
        component: ComponentId,
    },

    /// The serialized buffer ended early.
    #[error("truncated record data: needed {needed} bytes, {remaining} remaining")]
    TruncatedData {
        /// Bytes required to continue.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Bytes were left over after every component was decoded.
    #[error("{remaining} trailing bytes after record data")]
    TrailingData {
        /// Unconsumed bytes.
        remaining: usize,
    },

    /// A multi-component iteration named the same component twice.
    #[error("component {0} requested more than once in one iteration")]
    AliasedQuery(ComponentId),

    /// The 32-bit entity id space is used up.
    #[error("entity ids exhausted")]
    IdsExhausted,

    /// A configuration value is out of range.
    #[error("invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// A slot would not fit the `u32` offset table.
    #[error("component `{component}` is too large ({size} bytes)")]
    ComponentTooLarge {
        /// Name of the rejected component.
        component: String,
        /// Its size in bytes.
        size: usize,
    },

    /// A component operation failed.
    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;
