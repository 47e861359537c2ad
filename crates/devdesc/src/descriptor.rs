//! Descriptor types.
//!
//! Three well-known descriptors (vendor, hardware, firmware) exist at most
//! once per registry. Any number of custom descriptors may be installed
//! alongside them, each identified by a [`Tag`] and carrying an
//! [`Accessor`] for its value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accessor::{Accessor, AccessorType, ReadFunction};
use crate::error::{Error, Result};
use crate::tag::Tag;

/// Largest length a pointer-backed custom descriptor may declare.
pub const MAX_POINTER_LENGTH: usize = u8::MAX as usize;

/// The kind of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    /// The vendor root.
    Vendor,
    /// The hardware root.
    Hardware,
    /// The firmware root.
    Firmware,
    /// An entry of the custom list.
    Custom,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Hardware => write!(f, "hardware"),
            Self::Firmware => write!(f, "firmware"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Who made the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDescriptor {
    /// Vendor name.
    pub name: String,
    /// Vendor home page.
    pub url: String,
}

/// What board the firmware runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDescriptor {
    /// Board name.
    pub name: String,
    /// Board revision.
    pub revision: String,
    /// Board variant (population option, SKU).
    pub variant: String,
}

/// What image is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareDescriptor {
    /// Firmware name.
    pub name: String,
    /// Firmware revision.
    pub revision: String,
}

impl VendorDescriptor {
    /// Create a vendor descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl HardwareDescriptor {
    /// Create a hardware descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        revision: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            variant: variant.into(),
        }
    }
}

impl FirmwareDescriptor {
    /// Create a firmware descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
        }
    }
}

/// A tagged descriptor with a pluggable value accessor.
///
/// `length` only means something for pointer accessors, where it bounds the
/// bytes returned from the backing storage. Read functions report their own
/// length through the value they return.
#[derive(Debug, Clone)]
pub struct CustomDescriptor {
    tag: Tag,
    length: usize,
    value: Accessor,
}

impl CustomDescriptor {
    /// Create a pointer-backed descriptor over the whole of `data`.
    #[must_use]
    pub fn pointer(tag: Tag, data: &'static [u8]) -> Self {
        Self {
            tag,
            length: data.len(),
            value: Accessor::from_static(data),
        }
    }

    /// Create a pointer-backed descriptor exposing the first `length` bytes
    /// of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccessorType`] if `value` is not a pointer
    /// accessor, if `length` exceeds the storage, or if `length` does not
    /// fit in a byte.
    pub fn with_length(tag: Tag, value: Accessor, length: usize) -> Result<Self> {
        let Some(storage) = value.storage_len() else {
            return Err(Error::invalid_accessor(
                tag,
                "an explicit length requires a pointer accessor",
            ));
        };
        check_pointer_length(tag, storage, length)?;
        Ok(Self { tag, length, value })
    }

    /// Create a descriptor backed by a read function.
    #[must_use]
    pub fn read_fn(tag: Tag, f: impl ReadFunction + 'static) -> Self {
        Self {
            tag,
            length: 0,
            value: Accessor::read_fn(f),
        }
    }

    /// Create a descriptor from an untyped `(acctype, accessor, length)`
    /// triple, as found in descriptor tables built outside this crate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccessorType`] if `acctype` is not a known
    /// code, disagrees with the accessor variant, or the pointer length is
    /// out of bounds.
    pub fn from_raw(tag: Tag, acctype: u8, value: Accessor, length: usize) -> Result<Self> {
        let declared = AccessorType::try_from(acctype).map_err(|code| {
            Error::invalid_accessor(tag, format!("unknown access type 0x{code:02x}"))
        })?;
        if declared != value.acctype() {
            return Err(Error::invalid_accessor(
                tag,
                format!(
                    "declared {declared} access but accessor is {}",
                    value.acctype()
                ),
            ));
        }
        match declared {
            AccessorType::Pointer => Self::with_length(tag, value, length),
            AccessorType::ReadFunction => Ok(Self {
                tag,
                length: 0,
                value,
            }),
        }
    }

    /// Check the pointer length against the storage and the byte limit.
    pub(crate) fn validate(&self) -> Result<()> {
        match self.value.storage_len() {
            Some(storage) => check_pointer_length(self.tag, storage, self.length),
            None => Ok(()),
        }
    }

    /// The tag of this descriptor.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The access type of this descriptor.
    #[must_use]
    pub fn acctype(&self) -> AccessorType {
        self.value.acctype()
    }

    /// The value accessor.
    #[must_use]
    pub fn value(&self) -> &Accessor {
        &self.value
    }

    /// Declared length of a pointer-backed value; `None` for read functions.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self.value {
            Accessor::Pointer(_) => Some(self.length),
            Accessor::ReadFunction(_) => None,
        }
    }
}

fn check_pointer_length(tag: Tag, storage: usize, length: usize) -> Result<()> {
    if length > storage {
        return Err(Error::invalid_accessor(
            tag,
            format!("length {length} exceeds storage of {storage} bytes"),
        ));
    }
    if length > MAX_POINTER_LENGTH {
        return Err(Error::invalid_accessor(
            tag,
            format!("length {length} exceeds the maximum of {MAX_POINTER_LENGTH}"),
        ));
    }
    Ok(())
}

/// A descriptor handed to the registry for installation.
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// Vendor root.
    Vendor(VendorDescriptor),
    /// Hardware root.
    Hardware(HardwareDescriptor),
    /// Firmware root.
    Firmware(FirmwareDescriptor),
    /// Custom list entry.
    Custom(CustomDescriptor),
}

impl Descriptor {
    /// The kind of this descriptor.
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

impl From<VendorDescriptor> for Descriptor {
    fn from(d: VendorDescriptor) -> Self {
        Self::Vendor(d)
    }
}

impl From<HardwareDescriptor> for Descriptor {
    fn from(d: HardwareDescriptor) -> Self {
        Self::Hardware(d)
    }
}

impl From<FirmwareDescriptor> for Descriptor {
    fn from(d: FirmwareDescriptor) -> Self {
        Self::Firmware(d)
    }
}

impl From<CustomDescriptor> for Descriptor {
    fn from(d: CustomDescriptor) -> Self {
        Self::Custom(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(DescriptorKind::Vendor.to_string(), "vendor");
        assert_eq!(DescriptorKind::Hardware.to_string(), "hardware");
        assert_eq!(DescriptorKind::Firmware.to_string(), "firmware");
        assert_eq!(DescriptorKind::Custom.to_string(), "custom");
    }

    #[test]
    fn test_pointer_descriptor_uses_full_length() {
        let desc = CustomDescriptor::pointer(Tag::SERIALNO, b"SN-001");
        assert_eq!(desc.tag(), Tag::SERIALNO);
        assert_eq!(desc.acctype(), AccessorType::Pointer);
        assert_eq!(desc.length(), Some(6));
    }

    #[test]
    fn test_read_fn_descriptor_has_no_length() {
        let desc = CustomDescriptor::read_fn(Tag::LIBVERSION, |_tag: Tag| b"1.2.3".to_vec());
        assert_eq!(desc.acctype(), AccessorType::ReadFunction);
        assert_eq!(desc.length(), None);
    }

    #[test]
    fn test_with_length_within_storage() {
        let desc =
            CustomDescriptor::with_length(Tag::LIBVERSION, Accessor::from_static(b"ucdm 0.3.0\0"), 11)
                .unwrap();
        assert_eq!(desc.length(), Some(11));
    }

    #[test]
    fn test_with_length_past_storage_is_rejected() {
        let err = CustomDescriptor::with_length(Tag::SERIALNO, Accessor::from_static(b"abc"), 4)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAccessorType { .. }));
        assert!(err.to_string().contains("exceeds storage"));
    }

    #[test]
    fn test_with_length_over_byte_limit_is_rejected() {
        let data = vec![0u8; 300];
        let err = CustomDescriptor::with_length(Tag::new(9), Accessor::pointer(data), 300)
            .unwrap_err();
        assert!(err.to_string().contains("maximum of 255"));
    }

    #[test]
    fn test_with_length_requires_pointer() {
        let acc = Accessor::read_fn(|_tag: Tag| Vec::new());
        let err = CustomDescriptor::with_length(Tag::new(9), acc, 0).unwrap_err();
        assert!(err.to_string().contains("requires a pointer"));
    }

    #[test]
    fn test_validate_oversized_static_pointer() {
        static BIG: [u8; 256] = [0; 256];
        let desc = CustomDescriptor::pointer(Tag::new(7), &BIG);
        assert!(desc.validate().is_err());
        assert!(CustomDescriptor::pointer(Tag::new(7), &BIG[..255])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_owned_pointer_and_read_function() {
        let data = Accessor::pointer(vec![1u8; 40]);
        let owned = CustomDescriptor::with_length(Tag::new(8), data, 32).unwrap();
        assert!(owned.validate().is_ok());

        let live = CustomDescriptor::read_fn(Tag::new(8), |_tag: Tag| vec![0u8; 400]);
        assert!(live.validate().is_ok());
    }

    #[test]
    fn test_check_pointer_length_bounds() {
        assert!(check_pointer_length(Tag::new(1), 10, 10).is_ok());
        assert!(check_pointer_length(Tag::new(1), 10, 11).is_err());
        assert!(check_pointer_length(Tag::new(1), 300, 256).is_err());
    }

    #[test]
    fn test_from_raw_matching_pointer() {
        let desc = CustomDescriptor::from_raw(
            Tag::SERIALNO,
            AccessorType::PTR,
            Accessor::from_static(b"SN-001"),
            6,
        )
        .unwrap();
        assert_eq!(desc.acctype(), AccessorType::Pointer);
        assert_eq!(desc.length(), Some(6));
    }

    #[test]
    fn test_from_raw_matching_read_function_ignores_length() {
        let desc = CustomDescriptor::from_raw(
            Tag::LIBVERSION,
            AccessorType::RFUNC,
            Accessor::read_fn(|_tag: Tag| b"x".to_vec()),
            200,
        )
        .unwrap();
        assert_eq!(desc.length(), None);
    }

    #[test]
    fn test_from_raw_mismatch_is_rejected() {
        let err = CustomDescriptor::from_raw(
            Tag::SERIALNO,
            AccessorType::RFUNC,
            Accessor::from_static(b"SN-001"),
            6,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAccessorType { .. }));
        assert!(err.to_string().contains("declared read_function access"));
    }

    #[test]
    fn test_from_raw_unknown_code_is_rejected() {
        let err = CustomDescriptor::from_raw(
            Tag::SERIALNO,
            0x00,
            Accessor::from_static(b"SN-001"),
            6,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown access type 0x00"));
    }

    #[test]
    fn test_descriptor_kind_from_conversions() {
        let d: Descriptor = VendorDescriptor::new("Acme", "https://acme.example").into();
        assert_eq!(d.kind(), DescriptorKind::Vendor);
        let d: Descriptor = HardwareDescriptor::new("board", "B", "std").into();
        assert_eq!(d.kind(), DescriptorKind::Hardware);
        let d: Descriptor = FirmwareDescriptor::new("fw", "1.0").into();
        assert_eq!(d.kind(), DescriptorKind::Firmware);
        let d: Descriptor = CustomDescriptor::pointer(Tag::SERIALNO, b"x").into();
        assert_eq!(d.kind(), DescriptorKind::Custom);
    }

    #[test]
    fn test_root_serialization() {
        let hw = HardwareDescriptor::new("board", "B", "std");
        let json = serde_json::to_string(&hw).unwrap();
        let back: HardwareDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(hw, back);
    }
}
