//! `devdesc` - A registry of device descriptors
//!
//! This library keeps the identity of a device in one place: three root
//! descriptors (vendor, hardware, firmware) and an ordered list of tagged
//! custom descriptors whose values come either from fixed storage or from a
//! read function invoked on every read.
//!
//! ```
//! use devdesc::{read, CustomDescriptor, Registry, Tag, VendorDescriptor};
//!
//! let mut registry = Registry::new();
//! registry.install_vendor(VendorDescriptor::new("Acme", "https://acme.example"))?;
//! registry.install_custom(CustomDescriptor::pointer(Tag::SERIALNO, b"SN-001"))?;
//!
//! let value = read(registry.find(Tag::SERIALNO)?);
//! assert_eq!(value.as_bytes(), Some(&b"SN-001"[..]));
//! # Ok::<(), devdesc::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod accessor;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod identification;
pub mod logging;
pub mod reader;
pub mod registry;
pub mod snapshot;
pub mod tag;

pub use accessor::{Accessor, AccessorType, ReadFunction};
pub use config::Config;
pub use descriptor::{
    CustomDescriptor, Descriptor, DescriptorKind, FirmwareDescriptor, HardwareDescriptor,
    VendorDescriptor,
};
pub use error::{Error, Result};
pub use identification::{DeviceIdentification, DeviceObject, Page, ReadDeviceIdCode};
pub use logging::init_logging;
pub use reader::{read, Reader, Value};
pub use registry::{CustomId, DescriptorRef, Key, Registry, ReinstallPolicy};
pub use snapshot::Snapshot;
pub use tag::Tag;

/// Name of this library, as reported by its own `libversion` descriptor.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
