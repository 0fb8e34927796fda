//! Common utilities and helpers

use std::time::Duration;

pub mod logging;

/// Display helpers for the run summary
pub struct Utils;

impl Utils {
    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let milliseconds = duration.subsec_millis();

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Format a bit rate in bits per second for display
    pub fn format_bit_rate(bits_per_second: u64) -> String {
        const UNITS: &[&str] = &["bps", "kbps", "Mbps", "Gbps"];
        let mut rate = bits_per_second as f64;
        let mut unit_index = 0;

        while rate >= 1000.0 && unit_index < UNITS.len() - 1 {
            rate /= 1000.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bits_per_second, UNITS[unit_index])
        } else {
            format!("{:.2} {}", rate, UNITS[unit_index])
        }
    }
}
