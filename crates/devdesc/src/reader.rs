//! Resolution of descriptors into values.
//!
//! The reader never searches: it is handed a descriptor that
//! [`Registry::find`](crate::Registry::find) already returned and turns it
//! into something a consumer can use. Root descriptors come back as they are;
//! custom descriptors are resolved through their accessor.

use std::borrow::Cow;

use serde::Serialize;
use tracing::warn;

use crate::accessor::AccessorType;
use crate::descriptor::{CustomDescriptor, FirmwareDescriptor, HardwareDescriptor, VendorDescriptor};
use crate::error::{Error, Result};
use crate::registry::DescriptorRef;
use crate::tag::Tag;

/// Upper bound on bytes accepted from a read function.
pub const DEFAULT_MAX_VALUE_LEN: usize = 240;

/// A resolved descriptor value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value<'a> {
    /// The vendor root.
    Vendor(&'a VendorDescriptor),
    /// The hardware root.
    Hardware(&'a HardwareDescriptor),
    /// The firmware root.
    Firmware(&'a FirmwareDescriptor),
    /// Bytes resolved from a custom descriptor.
    Custom {
        /// Tag of the descriptor.
        tag: Tag,
        /// How the bytes were obtained.
        acctype: AccessorType,
        /// The value itself.
        data: Cow<'a, [u8]>,
    },
}

impl Value<'_> {
    /// Length of a custom value; `None` for roots.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::Custom { data, .. } => Some(data.len()),
            _ => None,
        }
    }

    /// Raw bytes of a custom value; `None` for roots.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Custom { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Render the value as text.
    ///
    /// Custom values are decoded lossily as UTF-8 up to the first NUL.
    /// Roots are rendered as their fields joined by spaces.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Vendor(v) => format!("{} {}", v.name, v.url),
            Self::Hardware(h) => format!("{} {} {}", h.name, h.revision, h.variant),
            Self::Firmware(f) => format!("{} {}", f.name, f.revision),
            Self::Custom { data, .. } => {
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                String::from_utf8_lossy(&data[..end]).into_owned()
            }
        }
    }
}

/// Resolves descriptors with a bound on read-function output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reader {
    max_value_len: usize,
}

impl Default for Reader {
    fn default() -> Self {
        Self {
            max_value_len: DEFAULT_MAX_VALUE_LEN,
        }
    }
}

impl Reader {
    /// Create a reader accepting at most `max_value_len` bytes from read
    /// functions.
    #[must_use]
    pub fn new(max_value_len: usize) -> Self {
        Self { max_value_len }
    }

    /// The bound on read-function output.
    #[must_use]
    pub fn max_value_len(&self) -> usize {
        self.max_value_len
    }

    /// Resolve a found descriptor.
    #[must_use]
    pub fn read<'a>(&self, descriptor: DescriptorRef<'a>) -> Value<'a> {
        match descriptor {
            DescriptorRef::Vendor(v) => Value::Vendor(v),
            DescriptorRef::Hardware(h) => Value::Hardware(h),
            DescriptorRef::Firmware(f) => Value::Firmware(f),
            DescriptorRef::Custom(c) => self.read_custom(c),
        }
    }

    /// Resolve a custom descriptor.
    ///
    /// Pointer descriptors yield their declared `length` bytes, identical on
    /// every call. Read functions are invoked afresh each time; output past
    /// the reader's bound is dropped.
    #[must_use]
    pub fn read_custom<'a>(&self, descriptor: &'a CustomDescriptor) -> Value<'a> {
        let tag = descriptor.tag();
        let data = match descriptor.length() {
            Some(length) => descriptor.value().resolve(tag, length),
            None => {
                let mut data = descriptor.value().resolve(tag, 0).into_owned();
                if data.len() > self.max_value_len {
                    warn!(
                        "Read function for {} returned {} bytes, truncating to {}",
                        tag,
                        data.len(),
                        self.max_value_len
                    );
                    data.truncate(self.max_value_len);
                }
                Cow::Owned(data)
            }
        };

        Value::Custom {
            tag,
            acctype: descriptor.acctype(),
            data,
        }
    }

    /// Copy a custom descriptor's value into `buf`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferTooSmall`] if the value does not fit; nothing is
    /// written in that case.
    pub fn read_into(&self, descriptor: &CustomDescriptor, buf: &mut [u8]) -> Result<usize> {
        let value = self.read_custom(descriptor);
        let data = value.as_bytes().unwrap_or_default();
        if data.len() > buf.len() {
            return Err(Error::BufferTooSmall {
                tag: descriptor.tag(),
                needed: data.len(),
                available: buf.len(),
            });
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }
}

/// Resolve a found descriptor with the default reader.
#[must_use]
pub fn read(descriptor: DescriptorRef<'_>) -> Value<'_> {
    Reader::default().read(descriptor)
}
