//! The descriptor registry.
//!
//! A [`Registry`] owns the three root descriptors and the list of custom
//! descriptors. It is filled during initialization through `&mut self` and
//! read afterwards through `&self`; share it behind an `Arc` once every
//! install has run. Nothing enforces the switch from installing to reading,
//! it is a convention of the caller.
//!
//! Custom descriptors form a singly linked list stored in an arena: nodes
//! live in a vector and link to each other by index, so appends are O(1)
//! and traversal follows installation order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::accessor::Accessor;
use crate::descriptor::{
    CustomDescriptor, Descriptor, DescriptorKind, FirmwareDescriptor, HardwareDescriptor,
    VendorDescriptor,
};
use crate::error::{Error, Result};
use crate::tag::Tag;

/// What to do when a root descriptor is installed a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReinstallPolicy {
    /// Keep the first descriptor and return [`Error::AlreadyInstalled`].
    #[default]
    Reject,
    /// Replace the installed descriptor and log a warning.
    Overwrite,
}

/// A lookup key: one of the roots, or a custom tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// The vendor root.
    Vendor,
    /// The hardware root.
    Hardware,
    /// The firmware root.
    Firmware,
    /// The first custom descriptor with this tag.
    Custom(Tag),
}

impl From<Tag> for Key {
    fn from(tag: Tag) -> Self {
        Self::Custom(tag)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Hardware => write!(f, "hardware"),
            Self::Firmware => write!(f, "firmware"),
            Self::Custom(tag) => write!(f, "{tag}"),
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vendor" => Ok(Self::Vendor),
            "hardware" => Ok(Self::Hardware),
            "firmware" => Ok(Self::Firmware),
            _ => s.parse::<Tag>().map(Self::Custom),
        }
    }
}

/// A borrowed view of an installed descriptor.
#[derive(Debug, Clone, Copy)]
pub enum DescriptorRef<'a> {
    /// The vendor root.
    Vendor(&'a VendorDescriptor),
    /// The hardware root.
    Hardware(&'a HardwareDescriptor),
    /// The firmware root.
    Firmware(&'a FirmwareDescriptor),
    /// A custom list entry.
    Custom(&'a CustomDescriptor),
}

impl DescriptorRef<'_> {
    /// The kind of the referenced descriptor.
    #[must_use]
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Self::Vendor(_) => DescriptorKind::Vendor,
            Self::Hardware(_) => DescriptorKind::Hardware,
            Self::Firmware(_) => DescriptorKind::Firmware,
            Self::Custom(_) => DescriptorKind::Custom,
        }
    }
}

/// Position of a custom descriptor in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomId(usize);

#[derive(Debug)]
struct Node {
    descriptor: CustomDescriptor,
    next: Option<usize>,
}

/// Table of root descriptors plus the custom descriptor list.
#[derive(Debug, Default)]
pub struct Registry {
    policy: ReinstallPolicy,
    vendor: Option<VendorDescriptor>,
    hardware: Option<HardwareDescriptor>,
    firmware: Option<FirmwareDescriptor>,
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Registry {
    /// Create an empty registry that rejects root re-installation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given re-installation policy.
    #[must_use]
    pub fn with_policy(policy: ReinstallPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// The re-installation policy for root descriptors.
    #[must_use]
    pub fn policy(&self) -> ReinstallPolicy {
        self.policy
    }

    /// Install any kind of descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInstalled`] when a root is already set and the
    /// policy is [`ReinstallPolicy::Reject`], or
    /// [`Error::InvalidAccessorType`] for a custom descriptor whose pointer
    /// length is out of bounds.
    pub fn install(&mut self, descriptor: impl Into<Descriptor>) -> Result<()> {
        match descriptor.into() {
            Descriptor::Vendor(d) => self.install_vendor(d),
            Descriptor::Hardware(d) => self.install_hardware(d),
            Descriptor::Firmware(d) => self.install_firmware(d),
            Descriptor::Custom(d) => self.install_custom(d).map(|_| ()),
        }
    }

    /// Install the vendor root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInstalled`] if the vendor root is set and the
    /// policy rejects re-installation.
    pub fn install_vendor(&mut self, descriptor: VendorDescriptor) -> Result<()> {
        let policy = self.policy;
        set_root(&mut self.vendor, descriptor, DescriptorKind::Vendor, policy)
    }

    /// Install the hardware root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInstalled`] if the hardware root is set and
    /// the policy rejects re-installation.
    pub fn install_hardware(&mut self, descriptor: HardwareDescriptor) -> Result<()> {
        let policy = self.policy;
        set_root(&mut self.hardware, descriptor, DescriptorKind::Hardware, policy)
    }

    /// Install the firmware root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInstalled`] if the firmware root is set and
    /// the policy rejects re-installation.
    pub fn install_firmware(&mut self, descriptor: FirmwareDescriptor) -> Result<()> {
        let policy = self.policy;
        set_root(&mut self.firmware, descriptor, DescriptorKind::Firmware, policy)
    }

    /// Append a custom descriptor to the end of the list.
    ///
    /// Descriptors sharing a tag are all kept; lookups return the one
    /// installed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccessorType`] if a pointer descriptor's
    /// length exceeds its storage or the 255-byte limit.
    pub fn install_custom(&mut self, descriptor: CustomDescriptor) -> Result<CustomId> {
        descriptor.validate()?;

        let index = self.nodes.len();
        debug!(
            "Installing custom descriptor {} ({}) at slot {}",
            descriptor.tag(),
            descriptor.acctype(),
            index
        );
        self.nodes.push(Node {
            descriptor,
            next: None,
        });

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);

        Ok(CustomId(index))
    }

    /// Install a `LIBVERSION` descriptor reading `"<name> <version>"`.
    ///
    /// The stored value carries a trailing NUL which is counted in its
    /// length, so C consumers can use it as a string in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccessorType`] if the text is longer than a
    /// pointer descriptor may be.
    pub fn install_library_version(&mut self, name: &str, version: &str) -> Result<CustomId> {
        let mut value = format!("{name} {version}").into_bytes();
        value.push(0);
        let length = value.len();
        let descriptor = CustomDescriptor::with_length(
            Tag::LIBVERSION,
            Accessor::pointer(value),
            length,
        )?;
        self.install_custom(descriptor)
    }

    /// Install the `LIBVERSION` descriptor of this crate.
    ///
    /// # Errors
    ///
    /// See [`Registry::install_library_version`].
    pub fn install_own_version(&mut self) -> Result<CustomId> {
        self.install_library_version(crate::NAME, crate::VERSION)
    }

    /// Look up a descriptor.
    ///
    /// Roots are returned if installed. Custom tags return the earliest
    /// installed descriptor with that tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing matches.
    pub fn find(&self, key: impl Into<Key>) -> Result<DescriptorRef<'_>> {
        let key = key.into();
        let found = match key {
            Key::Vendor => self.vendor.as_ref().map(DescriptorRef::Vendor),
            Key::Hardware => self.hardware.as_ref().map(DescriptorRef::Hardware),
            Key::Firmware => self.firmware.as_ref().map(DescriptorRef::Firmware),
            Key::Custom(tag) => self.find_all(tag).next().map(DescriptorRef::Custom),
        };
        trace!("Lookup of {} {}", key, if found.is_some() { "hit" } else { "missed" });
        found.ok_or(Error::NotFound { key })
    }

    /// Look up the first custom descriptor with `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no custom descriptor has this tag.
    pub fn find_custom(&self, tag: Tag) -> Result<&CustomDescriptor> {
        self.find_all(tag).next().ok_or_else(|| Error::not_found(tag))
    }

    /// Every custom descriptor with `tag`, in installation order.
    pub fn find_all(&self, tag: Tag) -> impl Iterator<Item = &CustomDescriptor> + '_ {
        self.custom().filter(move |d| d.tag() == tag)
    }

    /// Every custom descriptor, in installation order.
    #[must_use]
    pub fn custom(&self) -> CustomIter<'_> {
        CustomIter {
            nodes: &self.nodes,
            cursor: self.head,
        }
    }

    /// The custom descriptor installed under `id`.
    #[must_use]
    pub fn get(&self, id: CustomId) -> Option<&CustomDescriptor> {
        self.nodes.get(id.0).map(|node| &node.descriptor)
    }

    /// The vendor root, if installed.
    #[must_use]
    pub fn vendor(&self) -> Option<&VendorDescriptor> {
        self.vendor.as_ref()
    }

    /// The hardware root, if installed.
    #[must_use]
    pub fn hardware(&self) -> Option<&HardwareDescriptor> {
        self.hardware.as_ref()
    }

    /// The firmware root, if installed.
    #[must_use]
    pub fn firmware(&self) -> Option<&FirmwareDescriptor> {
        self.firmware.as_ref()
    }

    /// Number of custom descriptors.
    #[must_use]
    pub fn custom_len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no descriptor of any kind is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vendor.is_none()
            && self.hardware.is_none()
            && self.firmware.is_none()
            && self.nodes.is_empty()
    }
}

fn set_root<T>(
    slot: &mut Option<T>,
    descriptor: T,
    kind: DescriptorKind,
    policy: ReinstallPolicy,
) -> Result<()> {
    match (slot.is_some(), policy) {
        (false, _) => {
            debug!("Installing {} descriptor", kind);
        }
        (true, ReinstallPolicy::Reject) => {
            return Err(Error::AlreadyInstalled { kind });
        }
        (true, ReinstallPolicy::Overwrite) => {
            warn!("Overwriting already installed {} descriptor", kind);
        }
    }
    *slot = Some(descriptor);
    Ok(())
}

/// Iterator over custom descriptors in installation order.
#[derive(Debug, Clone)]
pub struct CustomIter<'a> {
    nodes: &'a [Node],
    cursor: Option<usize>,
}

impl<'a> Iterator for CustomIter<'a> {
    type Item = &'a CustomDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.nodes[self.cursor?];
        self.cursor = node.next;
        Some(&node.descriptor)
    }
}
