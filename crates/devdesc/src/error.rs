//! Error types for devdesc.
//!
//! This module defines all error types used throughout the devdesc crate.
//! Lookup misses and re-installation conflicts are ordinary, recoverable
//! errors; accessor contract violations are rejected at install time.

use thiserror::Error;

use crate::descriptor::DescriptorKind;
use crate::registry::Key;
use crate::tag::Tag;

/// The main error type for devdesc operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Registry Errors ===
    /// No descriptor matched the lookup key.
    #[error("descriptor not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: Key,
    },

    /// A root descriptor was installed twice under the reject policy.
    #[error("{kind} descriptor is already installed")]
    AlreadyInstalled {
        /// Which root was already populated.
        kind: DescriptorKind,
    },

    /// The accessor of a custom descriptor is not valid for its declared type.
    #[error("invalid accessor for tag {tag}: {message}")]
    InvalidAccessorType {
        /// Tag of the offending descriptor.
        tag: Tag,
        /// Description of what is wrong.
        message: String,
    },

    // === Reader Errors ===
    /// The caller's buffer cannot hold the resolved value.
    #[error("buffer too small for tag {tag}: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Tag of the descriptor being read.
        tag: Tag,
        /// Length of the resolved value.
        needed: usize,
        /// Length of the caller's buffer.
        available: usize,
    },

    // === Parse Errors ===
    /// A tag could not be parsed from text.
    #[error("invalid tag '{input}': expected a tag name, a decimal or a 0x-prefixed number below 256")]
    InvalidTag {
        /// The rejected input.
        input: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A configured custom descriptor names a read function nobody provides.
    #[error("unknown value source '{name}' for tag {tag}")]
    UnknownSource {
        /// Tag of the configured descriptor.
        tag: Tag,
        /// The source name that could not be resolved.
        name: String,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for devdesc operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a lookup miss for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<Key>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an invalid accessor error.
    #[must_use]
    pub fn invalid_accessor(tag: Tag, message: impl Into<String>) -> Self {
        Self::InvalidAccessorType {
            tag,
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error is a lookup miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a root re-installation conflict.
    #[must_use]
    pub fn is_already_installed(&self) -> bool {
        matches!(self, Self::AlreadyInstalled { .. })
    }
}
