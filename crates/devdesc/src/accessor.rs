//! Value accessors for custom descriptors.
//!
//! An [`Accessor`] says how a descriptor's value is obtained: either the
//! bytes are already resident in memory ([`Accessor::Pointer`]) or a
//! platform-supplied [`ReadFunction`] produces them on demand.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// Raw access type codes.
///
/// These are the values a descriptor table carries next to its accessor. In
/// this crate the code is always derived from the [`Accessor`] variant; the
/// raw form only appears when descriptors arrive as untyped `(code, value)`
/// pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorType {
    /// The value lives in memory and is returned directly.
    Pointer,
    /// The value is produced by calling a read function.
    ReadFunction,
}

impl AccessorType {
    /// Raw code for pointer access.
    pub const PTR: u8 = 0x01;
    /// Raw code for read-function access.
    pub const RFUNC: u8 = 0x02;

    /// The raw code of this access type.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pointer => Self::PTR,
            Self::ReadFunction => Self::RFUNC,
        }
    }
}

impl TryFrom<u8> for AccessorType {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            Self::PTR => Ok(Self::Pointer),
            Self::RFUNC => Ok(Self::ReadFunction),
            other => Err(other),
        }
    }
}

impl fmt::Display for AccessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer => write!(f, "pointer"),
            Self::ReadFunction => write!(f, "read_function"),
        }
    }
}

/// A callback producing a descriptor value on demand.
///
/// Implementations are called with the tag of the descriptor being read and
/// may return different bytes on every call (a live counter, a sensor). Any
/// synchronization they need is their own business; the registry calls them
/// from whatever thread is reading.
pub trait ReadFunction: Send + Sync {
    /// Produce the current value for `tag`.
    fn read(&self, tag: Tag) -> Vec<u8>;
}

impl<F> ReadFunction for F
where
    F: Fn(Tag) -> Vec<u8> + Send + Sync,
{
    fn read(&self, tag: Tag) -> Vec<u8> {
        self(tag)
    }
}

/// How a custom descriptor's value is obtained.
#[derive(Clone)]
pub enum Accessor {
    /// Bytes already resident in memory (ROM tables, static strings, or
    /// values loaded once at startup).
    Pointer(Cow<'static, [u8]>),
    /// A callback invoked on every read.
    ReadFunction(Arc<dyn ReadFunction>),
}

impl Accessor {
    /// Create a pointer accessor over static storage.
    #[must_use]
    pub const fn from_static(data: &'static [u8]) -> Self {
        Self::Pointer(Cow::Borrowed(data))
    }

    /// Create a pointer accessor over owned or borrowed storage.
    #[must_use]
    pub fn pointer(data: impl Into<Cow<'static, [u8]>>) -> Self {
        Self::Pointer(data.into())
    }

    /// Create a read-function accessor.
    #[must_use]
    pub fn read_fn(f: impl ReadFunction + 'static) -> Self {
        Self::ReadFunction(Arc::new(f))
    }

    /// The access type of this accessor.
    #[must_use]
    pub fn acctype(&self) -> AccessorType {
        match self {
            Self::Pointer(_) => AccessorType::Pointer,
            Self::ReadFunction(_) => AccessorType::ReadFunction,
        }
    }

    /// Size of the backing storage for pointer accessors.
    #[must_use]
    pub fn storage_len(&self) -> Option<usize> {
        match self {
            Self::Pointer(data) => Some(data.len()),
            Self::ReadFunction(_) => None,
        }
    }

    /// Resolve the accessor into bytes.
    ///
    /// Pointer accessors borrow the first `length` bytes of their storage and
    /// return the same bytes every time. Read functions are invoked with `tag`
    /// and `length` is ignored.
    ///
    /// # Panics
    ///
    /// Panics if `length` exceeds the pointer storage. The registry rejects
    /// such descriptors at install time, so reaching this is a bug.
    #[must_use]
    pub fn resolve(&self, tag: Tag, length: usize) -> Cow<'_, [u8]> {
        match self {
            Self::Pointer(data) => {
                assert!(
                    length <= data.len(),
                    "pointer length {length} exceeds storage of {} bytes for tag {tag}",
                    data.len()
                );
                Cow::Borrowed(&data[..length])
            }
            Self::ReadFunction(f) => Cow::Owned(f.read(tag)),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer(data) => f.debug_tuple("Pointer").field(&data.len()).finish(),
            Self::ReadFunction(_) => f.debug_tuple("ReadFunction").finish_non_exhaustive(),
        }
    }
}
