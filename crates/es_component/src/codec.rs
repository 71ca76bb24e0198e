//! Per-type serialization hooks for boxed components.
//!
//! A boxed component chooses its own wire encoding. Implementing
//! [`BoxedComponent`] supplies it through `encode`/`decode`; both default to
//! [`ComponentError::NotImplemented`], so a type that never needs to be
//! persisted only has to implement `Clone`.
//!
//! Two ready-made encodings are provided:
//!
//! - length-prefixed bytes (`u32` little-endian length, then the bytes), used
//!   by the `String` and `Vec<u8>` implementations;
//! - MessagePack through `rmp-serde`, for any serde type, see
//!   [`crate::BoxedOps::msgpack`].

use std::any::Any;
use std::io::Cursor;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ComponentError;

/// A component stored out of line, behind a holder in the record buffer.
///
/// # Examples
///
/// ```rust
/// use es_component::{BoxedComponent, ComponentError};
///
/// #[derive(Clone)]
/// struct Tags(Vec<String>);
///
/// // Clone is enough to store, clone and destroy the value; persisting it
/// // fails with `NotImplemented` until `encode` and `decode` are provided.
/// impl BoxedComponent for Tags {}
///
/// let mut out = Vec::new();
/// assert!(matches!(
///     Tags(vec![]).encode(&mut out),
///     Err(ComponentError::NotImplemented { .. })
/// ));
/// ```
pub trait BoxedComponent: Any + Clone {
    /// Append this value's wire encoding to `out`.
    ///
    /// # Errors
    ///
    /// The default returns [`ComponentError::NotImplemented`].
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ComponentError> {
        let _ = out;
        Err(ComponentError::NotImplemented {
            type_name: std::any::type_name::<Self>(),
        })
    }

    /// Decode a value from the front of `input`, returning it with the
    /// number of bytes consumed.
    ///
    /// # Errors
    ///
    /// The default returns [`ComponentError::NotImplemented`].
    fn decode(input: &[u8]) -> Result<(Self, usize), ComponentError> {
        let _ = input;
        Err(ComponentError::NotImplemented {
            type_name: std::any::type_name::<Self>(),
        })
    }
}

impl BoxedComponent for String {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ComponentError> {
        encode_len_prefixed(self.as_bytes(), out)
    }

    fn decode(input: &[u8]) -> Result<(Self, usize), ComponentError> {
        let (body, consumed) = decode_len_prefixed(input)?;
        let text = std::str::from_utf8(body)
            .map_err(|e| ComponentError::InvalidData(e.to_string()))?;
        Ok((text.to_owned(), consumed))
    }
}

impl BoxedComponent for Vec<u8> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ComponentError> {
        encode_len_prefixed(self, out)
    }

    fn decode(input: &[u8]) -> Result<(Self, usize), ComponentError> {
        let (body, consumed) = decode_len_prefixed(input)?;
        Ok((body.to_vec(), consumed))
    }
}

/// Write `bytes` preceded by their `u32` little-endian length.
///
/// # Errors
///
/// Returns [`ComponentError::InvalidData`] for inputs longer than
/// `u32::MAX` bytes.
pub fn encode_len_prefixed(bytes: &[u8], out: &mut Vec<u8>) -> Result<(), ComponentError> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        ComponentError::InvalidData(format!("{} bytes exceed the u32 length prefix", bytes.len()))
    })?;
    out.reserve(4 + bytes.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Read a length-prefixed byte string from the front of `input`.
///
/// Returns the body and the total number of bytes consumed, prefix included.
///
/// # Errors
///
/// Returns [`ComponentError::Truncated`] if the prefix or the body is cut off.
pub fn decode_len_prefixed(input: &[u8]) -> Result<(&[u8], usize), ComponentError> {
    let Some((head, rest)) = input.split_first_chunk::<4>() else {
        return Err(ComponentError::Truncated {
            needed: 4,
            remaining: input.len(),
        });
    };
    let len = u32::from_le_bytes(*head) as usize;
    let body = rest.get(..len).ok_or(ComponentError::Truncated {
        needed: len,
        remaining: rest.len(),
    })?;
    Ok((body, 4 + len))
}

/// Append `value` to `out` as MessagePack (struct fields by name).
///
/// # Errors
///
/// Returns [`ComponentError::Encode`] if serialisation fails.
pub fn encode_msgpack<T: Serialize + ?Sized>(
    value: &T,
    out: &mut Vec<u8>,
) -> Result<(), ComponentError> {
    rmp_serde::encode::write_named(out, value)?;
    Ok(())
}

/// Decode one MessagePack value from the front of `input`.
///
/// MessagePack is self-delimiting, so the number of bytes consumed is
/// known without a length prefix.
///
/// # Errors
///
/// Returns [`ComponentError::Decode`] if the input is malformed or cut off.
pub fn decode_msgpack<T: DeserializeOwned>(input: &[u8]) -> Result<(T, usize), ComponentError> {
    let mut cursor = Cursor::new(input);
    let value = rmp_serde::from_read(&mut cursor)?;
    let consumed = usize::try_from(cursor.position())
        .map_err(|e| ComponentError::InvalidData(e.to_string()))?;
    Ok((value, consumed))
}
