//! Point-in-time copies of a registry.
//!
//! Read functions may return something different on every call, so a
//! snapshot records when the values were read. The fingerprint covers the
//! values only, which makes two snapshots of an unchanged device compare
//! equal by fingerprint even though their timestamps differ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accessor::AccessorType;
use crate::descriptor::{FirmwareDescriptor, HardwareDescriptor, VendorDescriptor};
use crate::error::Result;
use crate::reader::Reader;
use crate::registry::Registry;
use crate::tag::Tag;

/// One custom descriptor as read into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEntry {
    /// Descriptor tag.
    pub tag: Tag,
    /// How the value was obtained.
    pub acctype: AccessorType,
    /// The value bytes.
    pub value: Vec<u8>,
}

impl CustomEntry {
    /// The value as text, up to the first NUL.
    #[must_use]
    pub fn text(&self) -> String {
        let end = self
            .value
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.value.len());
        String::from_utf8_lossy(&self.value[..end]).into_owned()
    }
}

/// Every descriptor of a registry, read once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the values were read.
    pub taken_at: DateTime<Utc>,
    /// Vendor root, if installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorDescriptor>,
    /// Hardware root, if installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareDescriptor>,
    /// Firmware root, if installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<FirmwareDescriptor>,
    /// Custom descriptors in installation order.
    pub custom: Vec<CustomEntry>,
    /// BLAKE3 hash of all values.
    pub fingerprint: String,
}

impl Snapshot {
    /// Read every descriptor of `registry` with the default reader.
    #[must_use]
    pub fn capture(registry: &Registry) -> Self {
        Self::capture_with(registry, Reader::default())
    }

    /// Read every descriptor of `registry` with `reader`.
    #[must_use]
    pub fn capture_with(registry: &Registry, reader: Reader) -> Self {
        let custom: Vec<CustomEntry> = registry
            .custom()
            .map(|descriptor| CustomEntry {
                tag: descriptor.tag(),
                acctype: descriptor.acctype(),
                value: reader
                    .read_custom(descriptor)
                    .as_bytes()
                    .unwrap_or_default()
                    .to_vec(),
            })
            .collect();

        let mut snapshot = Self {
            taken_at: Utc::now(),
            vendor: registry.vendor().cloned(),
            hardware: registry.hardware().cloned(),
            firmware: registry.firmware().cloned(),
            custom,
            fingerprint: String::new(),
        };
        snapshot.fingerprint = snapshot.compute_fingerprint();
        snapshot
    }

    /// Hash the descriptor values, leaving out the timestamp.
    #[must_use]
    pub fn compute_fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();

        let mut field = |bytes: &[u8]| {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        if let Some(v) = &self.vendor {
            field(b"vendor");
            field(v.name.as_bytes());
            field(v.url.as_bytes());
        }
        if let Some(h) = &self.hardware {
            field(b"hardware");
            field(h.name.as_bytes());
            field(h.revision.as_bytes());
            field(h.variant.as_bytes());
        }
        if let Some(f) = &self.firmware {
            field(b"firmware");
            field(f.name.as_bytes());
            field(f.revision.as_bytes());
        }
        for entry in &self.custom {
            field(&[entry.tag.raw(), entry.acctype.code()]);
            field(&entry.value);
        }

        hasher.finalize().to_hex().to_string()
    }

    /// Render the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check if the stored fingerprint matches the values.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.fingerprint == self.compute_fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CustomDescriptor;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .install_vendor(VendorDescriptor::new("Acme", "https://acme.example"))
            .unwrap();
        registry
            .install_firmware(FirmwareDescriptor::new("bootloader", "2.4.1"))
            .unwrap();
        registry.install_library_version("ucdm", "0.3.0").unwrap();
        registry
    }

    #[test]
    fn test_capture_copies_everything() {
        let snapshot = Snapshot::capture(&registry());

        assert_eq!(snapshot.vendor.as_ref().unwrap().name, "Acme");
        assert!(snapshot.hardware.is_none());
        assert_eq!(snapshot.firmware.as_ref().unwrap().revision, "2.4.1");
        assert_eq!(snapshot.custom.len(), 1);
        assert_eq!(snapshot.custom[0].tag, Tag::LIBVERSION);
        assert_eq!(snapshot.custom[0].text(), "ucdm 0.3.0");
        assert!(snapshot.verify());
    }

    #[test]
    fn test_fingerprint_ignores_timestamp() {
        let registry = registry();
        let first = Snapshot::capture(&registry);
        let second = Snapshot::capture(&registry);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_read_function_values() {
        let counter = Arc::new(AtomicU8::new(0));
        let source = Arc::clone(&counter);
        let mut registry = registry();
        registry
            .install_custom(CustomDescriptor::read_fn(Tag::new(0x60), move |_tag: Tag| {
                vec![source.fetch_add(1, Ordering::SeqCst)]
            }))
            .unwrap();

        let first = Snapshot::capture(&registry);
        let second = Snapshot::capture(&registry);
        assert_ne!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let mut snapshot = Snapshot::capture(&registry());
        snapshot.custom[0].value = b"ucdm 9.9.9\0".to_vec();
        assert!(!snapshot.verify());
    }

    #[test]
    fn test_field_boundaries_matter() {
        let mut a = Registry::new();
        a.install_vendor(VendorDescriptor::new("ab", "c")).unwrap();
        let mut b = Registry::new();
        b.install_vendor(VendorDescriptor::new("a", "bc")).unwrap();

        assert_ne!(
            Snapshot::capture(&a).fingerprint,
            Snapshot::capture(&b).fingerprint
        );
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = Snapshot::capture(&registry());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("hardware"));

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert!(back.verify());
    }

    #[test]
    fn test_to_json_is_pretty_and_parses_back() {
        let snapshot = Snapshot::capture(&registry());
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\n  \"taken_at\""));

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fingerprint, snapshot.fingerprint);
    }
}
