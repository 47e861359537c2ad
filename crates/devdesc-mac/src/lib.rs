//! macOS descriptor sources for devdesc.
//!
//! Values come from `ioreg` and `sysctl`. Each source returns an empty vector
//! when the command fails or its output cannot be parsed.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// A platform value source.
pub type SourceFn = fn() -> Vec<u8>;

/// Names of the sources this platform provides.
pub const SOURCES: &[&str] = &["serialno", "hostname", "uptime"];

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if `sysctl` cannot be run.
pub fn init() -> io::Result<()> {
    info!("Initializing macOS descriptor sources");
    Command::new("sysctl").arg("-n").arg("kern.ostype").output()?;
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
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

/// Platform serial number from the I/O registry.
#[must_use]
pub fn serialno() -> Vec<u8> {
    run(&["ioreg", "-rd1", "-c", "IOPlatformExpertDevice"])
        .and_then(|output| parse_serial(&output))
        .map(String::into_bytes)
        .unwrap_or_default()
}

/// Kernel host name.
#[must_use]
pub fn hostname() -> Vec<u8> {
    run(&["sysctl", "-n", "kern.hostname"])
        .map(|output| output.trim().as_bytes().to_vec())
        .unwrap_or_default()
}

/// Whole seconds since boot, in decimal.
#[must_use]
pub fn uptime() -> Vec<u8> {
    run(&["sysctl", "-n", "kern.boottime"])
        .and_then(|output| parse_boottime(&output))
        .map(|boot| (chrono::Utc::now().timestamp() - boot).max(0))
        .map(|secs| secs.to_string().into_bytes())
        .unwrap_or_default()
}

fn run(argv: &[&str]) -> Option<String> {
    let (program, args) = argv.split_first()?;
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!("{} exited with {}", program, output.status);
            None
        }
        Err(e) => {
            debug!("Cannot run {}: {}", program, e);
            None
        }
    }
}

/// The serial number line in `ioreg` output.
static SERIAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""IOPlatformSerialNumber"\s*=\s*"([^"]*)""#).expect("serial number pattern")
});

/// The seconds field of `kern.boottime`.
static BOOTTIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sec\s*=\s*(\d+)").expect("boot time pattern"));

fn parse_serial(ioreg: &str) -> Option<String> {
    SERIAL_REGEX.captures(ioreg).map(|caps| caps[1].to_string())
}

fn parse_boottime(sysctl: &str) -> Option<i64> {
    BOOTTIME_REGEX.captures(sysctl)?[1].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "macOS");
    }

    #[test]
    fn test_every_listed_source_resolves() {
        for name in SOURCES {
            assert!(source(name).is_some(), "missing source {name}");
        }
        assert!(source("tpm").is_none());
    }

    #[test]
    fn test_parse_serial() {
        let output = r#"
+-o J314sAP  <class IOPlatformExpertDevice, id 0x100000222, registered>
    {
      "IOPlatformUUID" = "00000000-0000-0000-0000-000000000000"
      "IOPlatformSerialNumber" = "C02XL0ABJGH5"
      "manufacturer" = <"Apple Inc.">
    }
"#;
        assert_eq!(parse_serial(output).as_deref(), Some("C02XL0ABJGH5"));
        assert_eq!(parse_serial("no serial here"), None);
    }

    #[test]
    fn test_parse_boottime() {
        let output = "{ sec = 1700000000, usec = 123456 } Tue Nov 14 22:13:20 2023";
        assert_eq!(parse_boottime(output), Some(1_700_000_000));
        assert_eq!(parse_boottime("garbage"), None);
    }

    #[test]
    fn test_patterns_compile() {
        assert!(SERIAL_REGEX.captures_len() > 1);
        assert!(BOOTTIME_REGEX.captures_len() > 1);
    }

    #[test]
    fn test_run_missing_program() {
        assert_eq!(run(&["devdesc-no-such-program"]), None);
        assert_eq!(run(&[]), None);
    }
}
