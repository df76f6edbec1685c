//! Output rendering for device records.
//!
//! Each device becomes one INI-style block:
//!
//! ```text
//!
//! [atmega8]
//!
//! name = ATmega8
//! device_code = 0x1E9307
//! paged = yes
//! page_size = 32
//! page_count = 128
//! ```
//!
//! Values are written verbatim; every field is canonical by construction.

use crate::device::DeviceConfig;

/// Render a single device block.
pub fn render_device(device: &DeviceConfig) -> String {
    let mut out = format!("\n[{}]\n\n", device.key);
    for (key, value) in device.fields() {
        out.push_str(&format!("{key} = {value}\n"));
    }
    out
}

/// Render all devices, in order.
pub fn render(devices: &[DeviceConfig]) -> String {
    devices.iter().map(render_device).collect()
}
