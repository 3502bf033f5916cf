use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
	DEFAULT_INTERVAL_MS, ENV_INTERVAL_MS, ENV_POWERCAP_ROOT, ENV_PROC_ROOT, ENV_SETTLE_US, POWERCAP_ROOT, PROC_ROOT,
	SETTLE_THRESHOLD_US,
};
use crate::error::{CollectorError, Result};

/// Settings for one measurement session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
	/// Period of the background tick
	pub interval: Duration,

	/// Minimum delay between the last snapshot and the final one taken by `stop`
	pub settle_threshold: Duration,

	/// Directory holding the `intel-rapl:<n>` zones
	pub powercap_root: PathBuf,

	/// Mount point of procfs, used for memory and CPU samples
	pub proc_root: PathBuf,
}

impl Default for SamplerConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
			settle_threshold: Duration::from_micros(SETTLE_THRESHOLD_US),
			powercap_root: PathBuf::from(POWERCAP_ROOT),
			proc_root: PathBuf::from(PROC_ROOT),
		}
	}
}

impl SamplerConfig {
	/// Builds a config from the `DB_ENERGY_*` environment variables, falling back to defaults
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from an arbitrary key lookup
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(raw) = lookup(ENV_INTERVAL_MS) {
			let ms = parse_u64(ENV_INTERVAL_MS, &raw)?;
			if ms == 0 {
				return Err(CollectorError::Config {
					key: ENV_INTERVAL_MS,
					value: raw,
					reason: "sampling interval must be positive".into(),
				});
			}
			config.interval = Duration::from_millis(ms);
		}
		if let Some(raw) = lookup(ENV_SETTLE_US) {
			config.settle_threshold = Duration::from_micros(parse_u64(ENV_SETTLE_US, &raw)?);
		}
		if let Some(raw) = lookup(ENV_POWERCAP_ROOT) {
			config.powercap_root = PathBuf::from(raw);
		}
		if let Some(raw) = lookup(ENV_PROC_ROOT) {
			config.proc_root = PathBuf::from(raw);
		}

		Ok(config)
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	pub fn with_settle_threshold(mut self, settle_threshold: Duration) -> Self {
		self.settle_threshold = settle_threshold;
		self
	}
}

pub fn parse_u64(key: &'static str, raw: &str) -> Result<u64> {
	raw.trim().parse::<u64>().map_err(|e| CollectorError::Config {
		key,
		value: raw.to_string(),
		reason: e.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn defaults_when_nothing_is_set() {
		let config = SamplerConfig::from_lookup(|_| None).unwrap();
		assert_eq!(config, SamplerConfig::default());
		assert_eq!(config.interval, Duration::from_secs(2));
		assert_eq!(config.settle_threshold, Duration::from_micros(1_600));
	}

	#[test]
	fn overrides_are_applied() {
		let config = SamplerConfig::from_lookup(lookup_from(&[
			(ENV_INTERVAL_MS, "250"),
			(ENV_SETTLE_US, "3000"),
			(ENV_POWERCAP_ROOT, "/tmp/rapl"),
		]))
		.unwrap();
		assert_eq!(config.interval, Duration::from_millis(250));
		assert_eq!(config.settle_threshold, Duration::from_millis(3));
		assert_eq!(config.powercap_root, PathBuf::from("/tmp/rapl"));
		assert_eq!(config.proc_root, PathBuf::from(PROC_ROOT));
	}

	#[test]
	fn builders_replace_timing_only() {
		let config = SamplerConfig::default()
			.with_interval(Duration::from_millis(10))
			.with_settle_threshold(Duration::ZERO);
		assert_eq!(config.interval, Duration::from_millis(10));
		assert_eq!(config.settle_threshold, Duration::ZERO);
		assert_eq!(config.powercap_root, PathBuf::from(POWERCAP_ROOT));
	}

	#[test]
	fn rejects_zero_and_garbage_intervals() {
		let zero = SamplerConfig::from_lookup(lookup_from(&[(ENV_INTERVAL_MS, "0")]));
		assert!(matches!(zero, Err(CollectorError::Config { key: ENV_INTERVAL_MS, .. })));

		let garbage = SamplerConfig::from_lookup(lookup_from(&[(ENV_INTERVAL_MS, "fast")]));
		assert!(matches!(garbage, Err(CollectorError::Config { .. })));
	}
}
