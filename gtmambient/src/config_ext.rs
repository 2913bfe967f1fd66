//! Extension of gtmconfig for the ambient controller

use crate::{AmbientSlot, AmbientTimings};
use gtmconfig::Config;

/// Reads ambient settings from the application configuration
pub trait AmbientConfigExt {
    /// Debounce delays, falling back to the defaults on unreadable values
    fn ambient_timings(&self) -> AmbientTimings;

    /// Empty slot whose handles start at the configured volume
    fn ambient_slot(&self) -> AmbientSlot;
}

impl AmbientConfigExt for Config {
    fn ambient_timings(&self) -> AmbientTimings {
        let defaults = AmbientTimings::default();
        AmbientTimings {
            dismiss_delay: self.get_dismiss_delay().unwrap_or(defaults.dismiss_delay),
            settle_window: self.get_settle_window().unwrap_or(defaults.settle_window),
            settle_interval: self.get_settle_interval().unwrap_or(defaults.settle_interval),
        }
    }

    fn ambient_slot(&self) -> AmbientSlot {
        AmbientSlot::new(self.get_audio_settings().effective_volume())
    }
}
