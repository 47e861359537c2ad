//! Device identification view of a registry.
//!
//! Hosts usually read descriptors through the Modbus "Read Device
//! Identification" function, which exposes a device as a sequence of numbered
//! objects and pages through them with `more_follows` / `next_object_id`.
//! This module maps a [`Registry`] onto that object model. It stops at the
//! object list: framing and transport belong to whoever serves the request.
//!
//! | Object | Name                | Source             |
//! |--------|---------------------|--------------------|
//! | 0x00   | VendorName          | vendor name        |
//! | 0x01   | ProductCode         | hardware variant   |
//! | 0x02   | MajorMinorRevision  | firmware revision  |
//! | 0x03   | VendorUrl           | vendor url         |
//! | 0x04   | ProductName         | hardware name      |
//! | 0x05   | ModelName           | hardware revision  |
//! | 0x06   | UserApplicationName | firmware name      |
//! | 0x80+n | extended            | n-th custom entry  |

use serde::Serialize;

use crate::descriptor::CustomDescriptor;
use crate::reader::Reader;
use crate::registry::Registry;

/// Object id of the vendor name.
pub const VENDOR_NAME: u8 = 0x00;
/// Object id of the product code.
pub const PRODUCT_CODE: u8 = 0x01;
/// Object id of the firmware revision.
pub const MAJOR_MINOR_REVISION: u8 = 0x02;
/// Object id of the vendor URL.
pub const VENDOR_URL: u8 = 0x03;
/// Object id of the product name.
pub const PRODUCT_NAME: u8 = 0x04;
/// Object id of the model name.
pub const MODEL_NAME: u8 = 0x05;
/// Object id of the application name.
pub const USER_APPLICATION_NAME: u8 = 0x06;
/// First extended object id; custom descriptors follow from here.
pub const FIRST_EXTENDED: u8 = 0x80;

/// Bytes each object costs in a response besides its value (id and length).
const OBJECT_OVERHEAD: usize = 2;

/// Which objects a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadDeviceIdCode {
    /// Objects 0x00 to 0x02.
    Basic,
    /// Basic plus 0x03 to 0x06.
    Regular,
    /// Regular plus every extended object.
    Extended,
    /// A single object.
    Specific(u8),
}

impl ReadDeviceIdCode {
    /// The request code carried on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Basic => 0x01,
            Self::Regular => 0x02,
            Self::Extended => 0x03,
            Self::Specific(_) => 0x04,
        }
    }

    fn includes(self, id: u8) -> bool {
        match self {
            Self::Basic => id <= MAJOR_MINOR_REVISION,
            Self::Regular => id <= USER_APPLICATION_NAME,
            Self::Extended => true,
            Self::Specific(wanted) => id == wanted,
        }
    }
}

/// One identification object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceObject {
    /// Object id.
    pub id: u8,
    /// Object value.
    pub value: Vec<u8>,
}

impl DeviceObject {
    /// Conventional name of the object.
    #[must_use]
    pub fn name(&self) -> &'static str {
        object_name(self.id)
    }

    fn encoded_len(&self) -> usize {
        OBJECT_OVERHEAD + self.value.len()
    }
}

/// Conventional name of an object id.
#[must_use]
pub fn object_name(id: u8) -> &'static str {
    match id {
        VENDOR_NAME => "VendorName",
        PRODUCT_CODE => "ProductCode",
        MAJOR_MINOR_REVISION => "MajorMinorRevision",
        VENDOR_URL => "VendorUrl",
        PRODUCT_NAME => "ProductName",
        MODEL_NAME => "ModelName",
        USER_APPLICATION_NAME => "UserApplicationName",
        FIRST_EXTENDED..=u8::MAX => "Extended",
        _ => "Reserved",
    }
}

/// One page of a paged identification read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Objects in this page.
    pub objects: Vec<DeviceObject>,
    /// Whether objects remain after this page.
    pub more_follows: bool,
    /// Id to request next; zero when nothing follows.
    pub next_object_id: u8,
}

/// Identification objects drawn from a registry.
#[derive(Debug, Clone, Copy)]
pub struct DeviceIdentification<'a> {
    registry: &'a Registry,
    reader: Reader,
}

impl<'a> DeviceIdentification<'a> {
    /// Create a view over `registry` using the default reader.
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_reader(registry, Reader::default())
    }

    /// Create a view over `registry` resolving custom values with `reader`.
    #[must_use]
    pub fn with_reader(registry: &'a Registry, reader: Reader) -> Self {
        Self { registry, reader }
    }

    /// All objects selected by `code`, in id order.
    ///
    /// Objects whose root descriptor is absent are left out. Read functions
    /// of extended objects are invoked once per call.
    #[must_use]
    pub fn objects(&self, code: ReadDeviceIdCode) -> Vec<DeviceObject> {
        self.pending(code, 0).map(|item| self.resolve(item)).collect()
    }

    /// A single object, if present.
    #[must_use]
    pub fn object(&self, id: u8) -> Option<DeviceObject> {
        if id >= FIRST_EXTENDED {
            let index = usize::from(id - FIRST_EXTENDED);
            let descriptor = self.registry.custom().nth(index)?;
            Some(DeviceObject {
                id,
                value: self.custom_bytes(descriptor),
            })
        } else {
            self.standard(id)
        }
    }

    /// Objects selected by `code` starting at `start`, filling at most
    /// `budget` response bytes.
    ///
    /// A page holds at least one object whenever any remain, even if that
    /// object alone exceeds the budget. Read functions run only for objects
    /// from `start` onwards; one sitting on the page boundary is invoked to
    /// learn its size and read again by the next page.
    #[must_use]
    pub fn page(&self, code: ReadDeviceIdCode, start: u8, budget: usize) -> Page {
        let mut objects: Vec<DeviceObject> = Vec::new();
        let mut used = 0;
        let mut next = None;

        for item in self.pending(code, start) {
            let fits =
                |len: usize| objects.is_empty() || used + OBJECT_OVERHEAD + len <= budget;

            if let Some(len) = item.known_len() {
                if !fits(len) {
                    next = Some(item.id());
                    break;
                }
            }
            let object = self.resolve(item);
            if !fits(object.value.len()) {
                next = Some(object.id);
                break;
            }
            used += object.encoded_len();
            objects.push(object);
        }

        Page {
            objects,
            more_follows: next.is_some(),
            next_object_id: next.unwrap_or(0),
        }
    }

    /// Selected objects from `start` on, with extended values unresolved.
    fn pending(
        &self,
        code: ReadDeviceIdCode,
        start: u8,
    ) -> impl Iterator<Item = Pending<'a>> + '_ {
        let standard = (VENDOR_NAME..=USER_APPLICATION_NAME)
            .filter(move |&id| id >= start && code.includes(id))
            .filter_map(move |id| self.standard(id))
            .map(Pending::Ready);

        let extended = (FIRST_EXTENDED..=u8::MAX)
            .zip(self.registry.custom())
            .filter(move |&(id, _)| id >= start && code.includes(id))
            .map(|(id, descriptor)| Pending::Custom(id, descriptor));

        standard.chain(extended)
    }

    fn resolve(&self, item: Pending<'_>) -> DeviceObject {
        match item {
            Pending::Ready(object) => object,
            Pending::Custom(id, descriptor) => DeviceObject {
                id,
                value: self.custom_bytes(descriptor),
            },
        }
    }

    fn standard(&self, id: u8) -> Option<DeviceObject> {
        let registry = self.registry;
        let text = match id {
            VENDOR_NAME => registry.vendor().map(|v| v.name.as_str()),
            PRODUCT_CODE => registry.hardware().map(|h| h.variant.as_str()),
            MAJOR_MINOR_REVISION => registry.firmware().map(|f| f.revision.as_str()),
            VENDOR_URL => registry.vendor().map(|v| v.url.as_str()),
            PRODUCT_NAME => registry.hardware().map(|h| h.name.as_str()),
            MODEL_NAME => registry.hardware().map(|h| h.revision.as_str()),
            USER_APPLICATION_NAME => registry.firmware().map(|f| f.name.as_str()),
            _ => None,
        }?;
        Some(DeviceObject {
            id,
            value: text.as_bytes().to_vec(),
        })
    }

    fn custom_bytes(&self, descriptor: &CustomDescriptor) -> Vec<u8> {
        self.reader
            .read_custom(descriptor)
            .as_bytes()
            .unwrap_or_default()
            .to_vec()
    }
}

/// An object selected for a response but not necessarily read yet.
enum Pending<'a> {
    Ready(DeviceObject),
    Custom(u8, &'a CustomDescriptor),
}

impl Pending<'_> {
    fn id(&self) -> u8 {
        match self {
            Self::Ready(object) => object.id,
            Self::Custom(id, _) => *id,
        }
    }

    /// Value length, when it is known without invoking a read function.
    fn known_len(&self) -> Option<usize> {
        match self {
            Self::Ready(object) => Some(object.value.len()),
            Self::Custom(_, descriptor) => descriptor.length(),
        }
    }
}
