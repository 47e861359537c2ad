//! Linux descriptor sources for devdesc
//!
//! Each source is a plain function returning the current value as bytes, or
//! an empty vector when the information is unavailable. The `devdesc` binary
//! wraps them as read functions.

#![cfg(target_os = "linux")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// A platform value source.
pub type SourceFn = fn() -> Vec<u8>;

/// Names of the sources this platform provides.
pub const SOURCES: &[&str] = &["serialno", "hostname", "uptime"];

const SERIAL_PATHS: &[&str] = &[
    "/sys/class/dmi/id/product_serial",
    "/etc/machine-id",
    "/var/lib/dbus/machine-id",
];

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
const UPTIME_PATH: &str = "/proc/uptime";

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if `/proc` is not mounted.
pub fn init() -> io::Result<()> {
    if !Path::new("/proc").is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "/proc is not available",
        ));
    }
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Look up a source by name.
#[must_use]
pub fn source(name: &str) -> Option<SourceFn> {
    match name {
        "serialno" => Some(serialno),
        "hostname" => Some(hostname),
        "uptime" => Some(uptime),
        _ => None,
    }
}

/// Machine serial number, falling back to the machine id.
#[must_use]
pub fn serialno() -> Vec<u8> {
    SERIAL_PATHS
        .iter()
        .find_map(|path| read_trimmed(path).filter(|value| !value.is_empty()))
        .map(String::into_bytes)
        .unwrap_or_default()
}

/// Kernel host name.
#[must_use]
pub fn hostname() -> Vec<u8> {
    read_trimmed(HOSTNAME_PATH)
        .map(String::into_bytes)
        .unwrap_or_default()
}

/// Whole seconds since boot, in decimal.
#[must_use]
pub fn uptime() -> Vec<u8> {
    read_trimmed(UPTIME_PATH)
        .and_then(|contents| parse_uptime(&contents))
        .map(|secs| secs.to_string().into_bytes())
        .unwrap_or_default()
}

fn parse_uptime(contents: &str) -> Option<u64> {
    let first = contents.split_whitespace().next()?;
    let whole = first.split('.').next()?;
    whole.parse().ok()
}

fn read_trimmed(path: &str) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents.trim().to_string()),
        Err(e) => {
            debug!("Cannot read {}: {}", path, e);
            None
        }
    }
}
