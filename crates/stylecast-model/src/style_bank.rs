//! Startup-built cache of pre-encoded style representations.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info};

use stylecast_core::{Device, EncodedFrame, JobValue};

use crate::error::ApplyError;
use crate::preprocess::load_style_image;
use crate::runner::{Runner, StyleRunner};

/// Map from style path to one pre-encoded representation per configured
/// device. Built single-threaded before serving starts; read-only afterwards.
#[derive(Debug, Default)]
pub struct StyleBank {
    entries: HashMap<String, HashMap<Device, EncodedFrame>>,
}

impl StyleBank {
    /// Loads every style image and pre-encodes it on every runner's device.
    ///
    /// Runners must already be loaded.
    pub fn build(style_paths: &[PathBuf], runners: &[StyleRunner]) -> Result<Self, ApplyError> {
        let mut entries = HashMap::new();
        for path in style_paths {
            let raw = load_style_image(path)?;
            let mut per_device = HashMap::new();
            for runner in runners {
                debug!(
                    style = %path.display(),
                    device = %runner.device(),
                    "pre-encoding style"
                );
                let frame = runner.encode(&JobValue::Raw(raw.clone()))?;
                per_device.insert(runner.device(), frame);
            }
            entries.insert(path.display().to_string(), per_device);
        }
        info!(styles = entries.len(), "style bank ready");
        Ok(Self { entries })
    }

    /// Looks up the representation of `style` for `device`.
    pub fn get(&self, style: &str, device: Device) -> Option<&EncodedFrame> {
        self.entries.get(style)?.get(&device)
    }

    /// Number of devices a style was pre-encoded for, or 0 if unknown.
    pub fn device_count(&self, style: &str) -> usize {
        self.entries.get(style).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn styles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
