//! Message value serialization.
//!
//! The [`Term`] trait is the common interface for values that travel
//! between processes. Any type that is `Serialize + DeserializeOwned` can
//! be a term; encoding uses `postcard` for compact binary serialization.
//!
//! Encoding at the send site is also how isolation is enforced: a message
//! is always a fresh copy, so no two processes ever observe shared mutable
//! state through it.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Error type for term decoding failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Failed to deserialize the term bytes.
    #[error("failed to decode term: {0}")]
    Deserialize(#[from] postcard::Error),
}

/// A value that can be sent between processes.
///
/// Automatically implemented for any `Serialize + DeserializeOwned + Send +
/// 'static` type. Message payloads, exit reasons, and task results are all
/// terms.
///
/// # Examples
///
/// ```
/// use wisp_core::Term;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// struct Ping {
///     id: u32,
/// }
///
/// let ping = Ping { id: 42 };
/// let bytes = ping.encode();
/// let decoded = Ping::decode(&bytes).unwrap();
/// assert_eq!(ping, decoded);
/// ```
pub trait Term: Sized + Send + 'static {
    /// Encodes this term into bytes.
    ///
    /// # Panics
    ///
    /// Panics if serialization fails, which does not happen for well-formed
    /// `Serialize` implementations.
    fn encode(&self) -> Vec<u8>;

    /// Decodes a term from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the bytes do not describe this type.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

impl<T> Term for T
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn encode(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("term serialization failed")
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        postcard::from_bytes(bytes).map_err(DecodeError::from)
    }
}

/// A message payload that has not been decoded yet.
///
/// Selective receive tests each queued message against an ordered list of
/// decode attempts; `RawTerm` is what those attempts run against.
///
/// # Examples
///
/// ```
/// use wisp_core::{RawTerm, Term};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct Tick(u64);
///
/// let raw = RawTerm::new(Tick(3).encode());
/// assert_eq!(raw.decode::<Tick>(), Some(Tick(3)));
/// ```
#[derive(Debug, Clone)]
pub struct RawTerm {
    bytes: Vec<u8>,
}

impl RawTerm {
    /// Wraps raw payload bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Attempts to decode this payload into a typed value.
    ///
    /// Returns `None` if the bytes do not describe `T`, which is how a
    /// receive pattern declines a message.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        postcard::from_bytes(&self.bytes).ok()
    }

    /// Attempts to decode, returning the error on failure.
    pub fn try_decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        postcard::from_bytes(&self.bytes).map_err(DecodeError::from)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the term, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for RawTerm {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for RawTerm {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Msg {
        Increment(u64),
        Get { reply_to: u64 },
    }

    #[test]
    fn test_encode_decode_enum() {
        let msg = Msg::Increment(5);
        let decoded = Msg::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);

        let msg = Msg::Get { reply_to: 1 };
        let decoded = Msg::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_decode_error() {
        let bad = vec![0xFF, 0xFF, 0xFF];
        assert!(Msg::decode(&bad).is_err());
    }

    #[test]
    fn test_raw_term_dispatch() {
        let raw = RawTerm::new(Msg::Increment(7).encode());
        assert_eq!(raw.decode::<Msg>(), Some(Msg::Increment(7)));
        assert!(raw.try_decode::<(String, String)>().is_err());
    }

    #[test]
    fn test_primitives_are_terms() {
        let n: u64 = 42;
        assert_eq!(u64::decode(&n.encode()).unwrap(), 42);

        let s = "hello".to_string();
        assert_eq!(String::decode(&s.encode()).unwrap(), "hello");

        let t = ("count".to_string(), 6u32);
        let decoded: (String, u32) = Term::decode(&t.encode()).unwrap();
        assert_eq!(t, decoded);
    }
}
