//! `devdesc` - CLI for the devdesc registry
//!
//! This binary builds a registry from configuration and platform sources and
//! prints what it holds.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use devdesc::cli::{Cli, Command, ConfigCommand, FindCommand, IdentCommand, ReadCommand};
use devdesc::{
    init_logging, Config, DescriptorRef, DeviceIdentification, Key, ReadFunction, Registry,
    Snapshot, Tag, Value,
};

// Platform-specific imports using conditional compilation
#[cfg(target_os = "linux")]
use devdesc_linux as platform;

#[cfg(target_os = "macos")]
use devdesc_mac as platform;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
        Command::Show(show_cmd) => {
            let (config, registry) = load(cli.config)?;
            handle_show(&config, &registry, show_cmd.json)
        }
        Command::List => {
            let (config, registry) = load(cli.config)?;
            handle_list(&config, &registry);
            Ok(())
        }
        Command::Find(find_cmd) => {
            let (config, registry) = load(cli.config)?;
            handle_find(&config, &registry, &find_cmd)
        }
        Command::Read(read_cmd) => {
            let (config, registry) = load(cli.config)?;
            handle_read(&config, &registry, &read_cmd)
        }
        Command::Ident(ident_cmd) => {
            let (config, registry) = load(cli.config)?;
            handle_ident(&config, &registry, &ident_cmd)
        }
    }
}

fn load(path: Option<PathBuf>) -> Result<(Config, Registry)> {
    let config = Config::load_from(path).context("failed to load configuration")?;
    platform::init().context("failed to initialize platform sources")?;
    let registry = build_registry(&config)?;
    Ok((config, registry))
}

fn build_registry(config: &Config) -> Result<Registry> {
    let registry = config
        .build_registry(|name| {
            platform::source(name).map(|f| {
                let read: Arc<dyn ReadFunction> = Arc::new(move |_tag: Tag| f());
                read
            })
        })
        .with_context(|| format!("failed to build registry on {}", platform::platform_name()))?;
    Ok(registry)
}

fn handle_show(config: &Config, registry: &Registry, json: bool) -> Result<()> {
    if json {
        let snapshot = Snapshot::capture_with(registry, config.reader());
        println!("{}", snapshot.to_json()?);
        return Ok(());
    }

    println!("Device Descriptors");
    println!("==================");
    println!();
    match registry.vendor() {
        Some(v) => println!("  Vendor:    {} ({})", v.name, v.url),
        None => println!("  Vendor:    -"),
    }
    match registry.hardware() {
        Some(h) => println!("  Hardware:  {} rev {} ({})", h.name, h.revision, h.variant),
        None => println!("  Hardware:  -"),
    }
    match registry.firmware() {
        Some(f) => println!("  Firmware:  {} {}", f.name, f.revision),
        None => println!("  Firmware:  -"),
    }
    println!();
    println!("  Custom descriptors: {}", registry.custom_len());
    handle_list(config, registry);
    Ok(())
}

fn handle_list(config: &Config, registry: &Registry) {
    let reader = config.reader();
    for (index, descriptor) in registry.custom().enumerate() {
        let value = reader.read_custom(descriptor);
        println!(
            "  {index:>3}  {:<12} {:<14} {}",
            descriptor.tag().to_string(),
            descriptor.acctype().to_string(),
            value.to_text()
        );
    }
}

fn handle_find(config: &Config, registry: &Registry, cmd: &FindCommand) -> Result<()> {
    let reader = config.reader();

    if cmd.all {
        let Key::Custom(tag) = cmd.key else {
            bail!("--all only applies to custom tags, not {}", cmd.key);
        };
        let mut found = false;
        for descriptor in registry.find_all(tag) {
            found = true;
            print_found(DescriptorRef::Custom(descriptor), &reader.read_custom(descriptor));
        }
        if !found {
            bail!("descriptor not found: {tag}");
        }
        return Ok(());
    }

    let descriptor = registry.find(cmd.key)?;
    print_found(descriptor, &reader.read(descriptor));
    Ok(())
}

fn print_found(descriptor: DescriptorRef<'_>, value: &Value<'_>) {
    match value.length() {
        Some(length) => println!("{}: {} ({length} bytes)", descriptor.kind(), value.to_text()),
        None => println!("{}: {}", descriptor.kind(), value.to_text()),
    }
}

fn handle_read(config: &Config, registry: &Registry, cmd: &ReadCommand) -> Result<()> {
    let descriptor = registry.find_custom(cmd.tag)?;
    let value = config.reader().read_custom(descriptor);

    if cmd.hex {
        let bytes = value.as_bytes().unwrap_or_default();
        println!("{}", to_hex(bytes));
    } else {
        println!("{}", value.to_text());
    }
    Ok(())
}

fn handle_ident(config: &Config, registry: &Registry, cmd: &IdentCommand) -> Result<()> {
    let ident = DeviceIdentification::with_reader(registry, config.reader());
    let objects = ident.objects(cmd.request());

    if let (Some(id), true) = (cmd.object, objects.is_empty()) {
        bail!("no identification object 0x{id:02x}");
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }

    for object in &objects {
        println!(
            "  0x{:02x}  {:<20} {}",
            object.id,
            object.name(),
            String::from_utf8_lossy(&object.value).trim_end_matches('\0')
        );
    }
    Ok(())
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Registry]");
                println!("  Reinstall policy:   {:?}", config.registry.reinstall);
                println!("  Max value length:   {}", config.registry.max_value_len);
                println!(
                    "  Library descriptor: {}",
                    config.registry.library_descriptor
                );
                println!();
                println!("[Roots]");
                println!("  Vendor:             {}", config.vendor.is_some());
                println!("  Hardware:           {}", config.hardware.is_some());
                println!("  Firmware:           {}", config.firmware.is_some());
                println!();
                println!("[Custom]");
                for entry in &config.custom {
                    match (&entry.value, &entry.source) {
                        (Some(value), _) => println!("  {:<18}  = {value:?}", entry.tag.to_string()),
                        (None, Some(source)) => {
                            println!("  {:<18}  <- {source}", entry.tag.to_string());
                        }
                        (None, None) => {}
                    }
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
