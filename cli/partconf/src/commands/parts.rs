//! `partconf parts` — list the devices a description file yields.

use anyhow::{bail, Context, Result};
use partconf_core::{convert_file, DeviceConfig};

use crate::config::RunSettings;

pub fn run(settings: &RunSettings, format: Option<&str>) -> Result<()> {
    let conversion = convert_file(&settings.input, &settings.options)
        .with_context(|| format!("reading parts from {}", settings.input.display()))?;

    match format.unwrap_or("human") {
        "human" => {
            for device in &conversion.devices {
                println!("{}", describe(device));
            }
            println!();
            println!("{} devices", conversion.devices.len());
        }
        "json" => println!("{}", serde_json::to_string_pretty(&conversion.devices)?),
        other => bail!("unknown output format: '{other}' (expected human or json)"),
    }
    Ok(())
}

/// One summary line: key, device code, flash layout.
fn describe(device: &DeviceConfig) -> String {
    let flash = match &device.geometry {
        Some(g) => format!(
            "{} bytes ({} pages x {} words)",
            g.flash_size(),
            g.page_count,
            g.page_size
        ),
        None => "unpaged".to_string(),
    };
    format!("  {:<24} {}  {}", device.key, device.device_code, flash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use partconf_core::{DeviceSignature, FlashGeometry};

    #[test]
    fn describe_paged_device() {
        let device = DeviceConfig {
            name: "ATmega8".into(),
            key: "atmega8".into(),
            device_code: DeviceSignature([0x1E, 0x93, 0x07]),
            geometry: Some(FlashGeometry {
                page_size: 32,
                page_count: 128,
            }),
            source_line: 1,
        };
        let line = describe(&device);
        assert!(line.contains("atmega8"));
        assert!(line.contains("0x1E9307"));
        assert!(line.contains("8192 bytes (128 pages x 32 words)"));
    }

    #[test]
    fn describe_unpaged_device() {
        let device = DeviceConfig {
            name: "AT90S1200".into(),
            key: "at90s1200".into(),
            device_code: DeviceSignature([0x1E, 0x90, 0x01]),
            geometry: None,
            source_line: 1,
        };
        assert!(describe(&device).ends_with("unpaged"));
    }
}
