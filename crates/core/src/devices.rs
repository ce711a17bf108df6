//! Compute device identifiers and device-list parsing.
//!
//! The pool is sized and pinned by an ordered device list (e.g.
//! `cuda:0,cuda:1`). Identifiers are opaque to the scheduler; they are only
//! checked for shape here and handed to the engine loader unchanged.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of a device identifier.
const MAX_DEVICE_LEN: usize = 64;

/// Maximum number of devices a single pool may drive.
pub const MAX_DEVICES: usize = 64;

/// Opaque compute device identifier, e.g. `cuda:0` or `cpu`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a device identifier.
    ///
    /// Rules:
    /// - Must not be empty.
    /// - Must not exceed `MAX_DEVICE_LEN` characters.
    /// - Must contain only alphanumeric, colon, hyphen, underscore, or dot characters.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "Device name must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_DEVICE_LEN {
            return Err(CoreError::Validation(format!(
                "Device name must not exceed {MAX_DEVICE_LEN} characters"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
        {
            return Err(CoreError::Validation(format!(
                "Device name \"{name}\" may only contain alphanumeric, colon, hyphen, underscore, or dot characters"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a comma-separated device list, preserving order.
///
/// Blank entries are skipped. The result must be non-empty, free of
/// duplicates, and at most `MAX_DEVICES` long.
pub fn parse_device_list(raw: &str) -> Result<Vec<DeviceId>, CoreError> {
    let devices = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(DeviceId::new)
        .collect::<Result<Vec<_>, _>>()?;

    if devices.is_empty() {
        return Err(CoreError::Config(
            "At least one device must be configured".to_string(),
        ));
    }
    if devices.len() > MAX_DEVICES {
        return Err(CoreError::Config(format!(
            "At most {MAX_DEVICES} devices may be configured"
        )));
    }

    let mut seen = HashSet::with_capacity(devices.len());
    for device in &devices {
        if !seen.insert(device.as_str()) {
            return Err(CoreError::Config(format!("Duplicate device: \"{device}\"")));
        }
    }

    Ok(devices)
}
