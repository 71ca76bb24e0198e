//! Component-layer error types.

/// Errors raised while describing a component type or running one of its
/// type-erased operations.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The component type has no serialization hook.
    #[error("serialization is not implemented for `{type_name}`")]
    NotImplemented {
        /// Rust type name of the component.
        type_name: &'static str,
    },

    /// The input ended before a complete value could be decoded.
    #[error("truncated component data: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually left in the input.
        remaining: usize,
    },

    /// The input was long enough but did not hold a valid value.
    #[error("invalid component data: {0}")]
    InvalidData(String),

    /// A type-erased payload did not hold the type its descriptor names.
    #[error("payload does not hold a `{expected}`")]
    PayloadMismatch {
        /// Type the operation table was built for.
        expected: &'static str,
    },

    /// A flat type needs a stricter alignment than the record buffer guarantees.
    #[error("`{type_name}` needs {align}-byte alignment, slots are only {max}-byte aligned")]
    Alignment {
        /// Rust type name of the component.
        type_name: &'static str,
        /// Alignment the type requires.
        align: usize,
        /// Alignment every slot is guaranteed to have.
        max: usize,
    },

    /// Failed to encode a value to MessagePack.
    #[error("failed to encode component: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a value from MessagePack.
    #[error("failed to decode component: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
