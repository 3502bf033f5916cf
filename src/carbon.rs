//! Carbon intensity of the electricity grid the benchmark runs on.
//!
//! The intensity is looked up once per process run by the driver and then passed
//! explicitly to [`aggregate`](crate::stats::aggregate); nothing here is global.

use tracing::info;

use crate::constants::ENV_CARBON_INTENSITY;
use crate::error::{CollectorError, Result};
use crate::util::joules_to_kwh;

/// Grid carbon intensity in grams of CO₂-equivalent per kWh
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct CarbonIntensity(f64);

impl CarbonIntensity {
	/// Accepts finite, non-negative intensities only
	pub fn new(g_per_kwh: f64) -> Option<Self> {
		(g_per_kwh.is_finite() && g_per_kwh >= 0.0).then_some(Self(g_per_kwh))
	}

	pub fn g_per_kwh(self) -> f64 {
		self.0
	}

	/// Emissions attributable to `joules` of consumed energy
	pub fn emissions_g(self, joules: f64) -> f64 {
		joules_to_kwh(joules) * self.0
	}
}

/// Where a carbon intensity value comes from
pub trait CarbonIntensitySource {
	/// Provider name for diagnostics
	fn name(&self) -> &str;

	/// Current intensity in gCO₂eq/kWh
	fn current(&self) -> Result<f64>;
}

/// A constant intensity, e.g. a regional average from a published dataset
#[derive(Debug, Clone, Copy)]
pub struct FixedIntensity(pub f64);

impl CarbonIntensitySource for FixedIntensity {
	fn name(&self) -> &str {
		"fixed"
	}

	fn current(&self) -> Result<f64> {
		Ok(self.0)
	}
}

/// Reads the intensity from an environment variable
#[derive(Debug, Clone)]
pub struct EnvIntensity {
	pub var: String,
}

impl Default for EnvIntensity {
	fn default() -> Self {
		Self {
			var: ENV_CARBON_INTENSITY.to_string(),
		}
	}
}

impl CarbonIntensitySource for EnvIntensity {
	fn name(&self) -> &str {
		&self.var
	}

	fn current(&self) -> Result<f64> {
		let raw = std::env::var(&self.var).map_err(|e| CollectorError::InvalidCarbonIntensity {
			source_name: self.var.clone(),
			value: e.to_string(),
		})?;
		raw.trim().parse().map_err(|_| CollectorError::InvalidCarbonIntensity {
			source_name: self.var.clone(),
			value: raw,
		})
	}
}

/// Fetches and validates a fresh intensity from `source`
pub fn refresh(source: &dyn CarbonIntensitySource) -> Result<CarbonIntensity> {
	let value = source.current()?;
	let intensity = CarbonIntensity::new(value).ok_or_else(|| CollectorError::InvalidCarbonIntensity {
		source_name: source.name().to_string(),
		value: value.to_string(),
	})?;
	info!(source = source.name(), g_per_kwh = value, "carbon intensity refreshed");
	Ok(intensity)
}
