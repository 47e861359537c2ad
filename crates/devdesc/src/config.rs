//! Configuration management for devdesc.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. Besides
//! registry behaviour, the configuration can describe the descriptors
//! themselves, which is how the `devdesc` binary populates its registry.

use std::path::PathBuf;
use std::sync::Arc;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accessor::{Accessor, AccessorType, ReadFunction};
use crate::descriptor::{
    CustomDescriptor, FirmwareDescriptor, HardwareDescriptor, VendorDescriptor, MAX_POINTER_LENGTH,
};
use crate::error::{Error, Result};
use crate::reader::{Reader, DEFAULT_MAX_VALUE_LEN};
use crate::registry::{Registry, ReinstallPolicy};
use crate::tag::Tag;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "devdesc";

/// Prefix of environment variables overriding the configuration.
const ENV_PREFIX: &str = "DEVDESC_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DEVDESC_`, sections separated by
///    a double underscore, e.g. `DEVDESC_REGISTRY__MAX_VALUE_LEN=64`)
/// 2. TOML config file at `~/.config/devdesc/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry behaviour.
    pub registry: RegistryConfig,
    /// Vendor root descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorDescriptor>,
    /// Hardware root descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareDescriptor>,
    /// Firmware root descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<FirmwareDescriptor>,
    /// Custom descriptors, installed in the order listed.
    pub custom: Vec<CustomConfig>,
}

/// Registry-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// What happens when a root descriptor is installed twice.
    pub reinstall: ReinstallPolicy,
    /// Most bytes accepted from a read function.
    pub max_value_len: usize,
    /// Install this crate's own `libversion` descriptor first.
    pub library_descriptor: bool,
}

/// One configured custom descriptor.
///
/// Exactly one of `value` and `source` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomConfig {
    /// Descriptor tag, by name or number.
    pub tag: Tag,
    /// Fixed text, stored as a pointer descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Name of a platform read function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reinstall: ReinstallPolicy::Reject,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            library_descriptor: true,
        }
    }
}

impl CustomConfig {
    /// A custom descriptor with fixed text.
    #[must_use]
    pub fn value(tag: Tag, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: Some(value.into()),
            source: None,
        }
    }

    /// A custom descriptor backed by a named read function.
    #[must_use]
    pub fn source(tag: Tag, source: impl Into<String>) -> Self {
        Self {
            tag,
            value: None,
            source: Some(source.into()),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        debug!("Loading configuration from {}", config_file.display());

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.registry.max_value_len == 0 || self.registry.max_value_len > MAX_POINTER_LENGTH {
            return Err(Error::config_validation(format!(
                "max_value_len must be between 1 and {MAX_POINTER_LENGTH}, got {}",
                self.registry.max_value_len
            )));
        }

        for entry in &self.custom {
            match (&entry.value, &entry.source) {
                (Some(_), Some(_)) => {
                    return Err(Error::config_validation(format!(
                        "custom descriptor {} sets both value and source",
                        entry.tag
                    )));
                }
                (None, None) => {
                    return Err(Error::config_validation(format!(
                        "custom descriptor {} needs a value or a source",
                        entry.tag
                    )));
                }
                (Some(value), None) if value.len() > MAX_POINTER_LENGTH => {
                    return Err(Error::config_validation(format!(
                        "value of custom descriptor {} is {} bytes, the limit is {MAX_POINTER_LENGTH}",
                        entry.tag,
                        value.len()
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// The reader matching this configuration.
    #[must_use]
    pub fn reader(&self) -> Reader {
        Reader::new(self.registry.max_value_len)
    }

    /// Build a registry holding every configured descriptor.
    ///
    /// `resolve` maps `source` names to read functions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSource`] if `resolve` does not know a source,
    /// or any error raised while installing.
    pub fn build_registry<F>(&self, resolve: F) -> Result<Registry>
    where
        F: Fn(&str) -> Option<Arc<dyn ReadFunction>>,
    {
        let mut registry = Registry::with_policy(self.registry.reinstall);

        if self.registry.library_descriptor {
            registry.install_own_version()?;
        }
        if let Some(vendor) = &self.vendor {
            registry.install_vendor(vendor.clone())?;
        }
        if let Some(hardware) = &self.hardware {
            registry.install_hardware(hardware.clone())?;
        }
        if let Some(firmware) = &self.firmware {
            registry.install_firmware(firmware.clone())?;
        }

        for entry in &self.custom {
            let descriptor = match (&entry.value, &entry.source) {
                (Some(value), _) => {
                    let data = value.clone().into_bytes();
                    let length = data.len();
                    CustomDescriptor::with_length(entry.tag, Accessor::pointer(data), length)?
                }
                (None, Some(name)) => {
                    let f = resolve(name).ok_or_else(|| Error::UnknownSource {
                        tag: entry.tag,
                        name: name.clone(),
                    })?;
                    CustomDescriptor::from_raw(
                        entry.tag,
                        AccessorType::RFUNC,
                        Accessor::ReadFunction(f),
                        0,
                    )?
                }
                (None, None) => {
                    return Err(Error::config_validation(format!(
                        "custom descriptor {} needs a value or a source",
                        entry.tag
                    )));
                }
            };
            registry.install_custom(descriptor)?;
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Key;
    use figment::Jail;

    fn no_sources(_name: &str) -> Option<Arc<dyn ReadFunction>> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.registry.reinstall, ReinstallPolicy::Reject);
        assert_eq!(config.registry.max_value_len, 240);
        assert!(config.registry.library_descriptor);
        assert!(config.vendor.is_none());
        assert!(config.custom.is_empty());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_max_value_len() {
        let mut config = Config::default();
        config.registry.max_value_len = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_value_len"));
    }

    #[test]
    fn test_validate_oversized_max_value_len() {
        let mut config = Config::default();
        config.registry.max_value_len = 256;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_custom_needs_exactly_one_origin() {
        let mut config = Config::default();
        config.custom = vec![CustomConfig {
            tag: Tag::SERIALNO,
            value: Some("SN-001".to_string()),
            source: Some("serialno".to_string()),
        }];
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("both value and source"));

        config.custom = vec![CustomConfig {
            tag: Tag::SERIALNO,
            value: None,
            source: None,
        }];
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("needs a value or a source"));
    }

    #[test]
    fn test_validate_long_value() {
        let mut config = Config::default();
        config.custom = vec![CustomConfig::value(Tag::new(0x10), "x".repeat(300))];
        assert!(config.validate().unwrap_err().to_string().contains("limit is 255"));
    }

    #[test]
    fn test_reader_uses_max_value_len() {
        let mut config = Config::default();
        config.registry.max_value_len = 32;
        assert_eq!(config.reader().max_value_len(), 32);
    }

    #[test]
    fn test_build_registry_from_config() {
        let config = Config {
            registry: RegistryConfig {
                library_descriptor: false,
                ..RegistryConfig::default()
            },
            vendor: Some(VendorDescriptor::new("Acme", "https://acme.example")),
            hardware: None,
            firmware: Some(FirmwareDescriptor::new("bootloader", "2.4.1")),
            custom: vec![
                CustomConfig::value(Tag::SERIALNO, "SN-001"),
                CustomConfig::source(Tag::new(0x20), "uptime"),
            ],
        };

        let registry = config
            .build_registry(|name| {
                (name == "uptime").then(|| {
                    let f: Arc<dyn ReadFunction> = Arc::new(|_tag: Tag| b"42".to_vec());
                    f
                })
            })
            .unwrap();

        assert!(registry.find(Key::Vendor).is_ok());
        assert!(registry.find(Key::Hardware).is_err());
        assert_eq!(registry.custom_len(), 2);

        let serial = registry.find_custom(Tag::SERIALNO).unwrap();
        assert_eq!(serial.acctype(), AccessorType::Pointer);
        assert_eq!(serial.length(), Some(6));

        let uptime = registry.find_custom(Tag::new(0x20)).unwrap();
        assert_eq!(uptime.acctype(), AccessorType::ReadFunction);
    }

    #[test]
    fn test_build_registry_installs_library_descriptor_first() {
        let mut config = Config::default();
        config.custom = vec![CustomConfig::value(Tag::LIBVERSION, "app 1.0")];

        let registry = config.build_registry(no_sources).unwrap();
        let first = registry.custom().next().unwrap();
        let text = config.reader().read_custom(first).to_text();
        assert!(text.starts_with("devdesc "));
        assert_eq!(registry.find_all(Tag::LIBVERSION).count(), 2);
    }

    #[test]
    fn test_build_registry_unknown_source() {
        let mut config = Config::default();
        config.custom = vec![CustomConfig::source(Tag::SERIALNO, "tpm")];

        let err = config.build_registry(no_sources).unwrap_err();
        assert!(matches!(err, Error::UnknownSource { ref name, .. } if name == "tpm"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("devdesc"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "devdesc.toml",
                r#"
                [registry]
                reinstall = "overwrite"

                [vendor]
                name = "Acme"
                url = "https://acme.example"

                [hardware]
                name = "mainboard"
                revision = "C"
                variant = "full"

                [[custom]]
                tag = "serialno"
                value = "SN-001"

                [[custom]]
                tag = 0x42
                source = "uptime"
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("devdesc.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.registry.reinstall, ReinstallPolicy::Overwrite);
            assert_eq!(config.registry.max_value_len, 240);
            assert_eq!(config.vendor.as_ref().map(|v| v.name.as_str()), Some("Acme"));
            assert_eq!(config.hardware.as_ref().map(|h| h.variant.as_str()), Some("full"));
            assert!(config.firmware.is_none());
            assert_eq!(
                config.custom,
                vec![
                    CustomConfig::value(Tag::SERIALNO, "SN-001"),
                    CustomConfig::source(Tag::new(0x42), "uptime"),
                ]
            );
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "devdesc.toml",
                r#"
                [registry]
                max_value_len = 100
                "#,
            )?;
            jail.set_env("DEVDESC_REGISTRY__MAX_VALUE_LEN", "64");
            jail.set_env("DEVDESC_REGISTRY__LIBRARY_DESCRIPTOR", "false");

            let config = Config::load_from(Some(PathBuf::from("devdesc.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.registry.max_value_len, 64);
            assert!(!config.registry.library_descriptor);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "devdesc.toml",
                r#"
                [[custom]]
                tag = "serialno"
                "#,
            )?;

            let result = Config::load_from(Some(PathBuf::from("devdesc.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let mut config = Config::default();
        config.custom = vec![CustomConfig::value(Tag::SERIALNO, "SN-001")];
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("max_value_len"));
        assert!(json.contains(r#""tag":"serialno""#));
        assert!(!json.contains("vendor"));
    }
}
