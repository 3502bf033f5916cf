pub mod cpu;
pub mod disk;
pub mod mem;

use std::time::Duration;

use crate::constants::{JOULES_PER_KWH, MICROJOULES_PER_JOULE};

/// Converts a raw counter delta to joules
pub fn uj_to_joules(energy_uj: u64) -> f64 {
	energy_uj as f64 / MICROJOULES_PER_JOULE
}

pub fn joules_to_kwh(joules: f64) -> f64 {
	joules / JOULES_PER_KWH
}

/// Average power in watts, or zero over an empty interval
pub fn average_power_w(joules: f64, duration: Duration) -> f64 {
	let secs = duration.as_secs_f64();
	if secs > 0.0 { joules / secs } else { 0.0 }
}
