use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::constants::BYTES_PER_GIB;

/// System memory usage at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemorySample {
	/// Percentage of memory not available to new allocations
	pub percent_used: f64,
	pub used_gb: f64,
	/// Page cache and buffers
	pub cached_gb: f64,
	/// `used_gb + cached_gb`
	pub total_gb: f64,
}

/// Parses `/proc/meminfo` (values in kB)
pub fn parse_meminfo(contents: &str) -> io::Result<MemorySample> {
	let fields: HashMap<&str, u64> = contents
		.lines()
		.filter_map(|line| {
			let (key, rest) = line.split_once(':')?;
			let value = rest.split_whitespace().next()?.parse().ok()?;
			Some((key.trim(), value))
		})
		.collect();

	let get = |key: &str| {
		fields.get(key).copied().ok_or_else(|| {
			io::Error::new(io::ErrorKind::InvalidData, format!("meminfo is missing {key}"))
		})
	};

	let total = get("MemTotal")?;
	let free = get("MemFree")?;
	let available = get("MemAvailable").unwrap_or(free);
	let buffers = get("Buffers").unwrap_or(0);
	let cached = get("Cached").unwrap_or(0) + get("SReclaimable").unwrap_or(0);

	if total == 0 {
		return Err(io::Error::new(io::ErrorKind::InvalidData, "MemTotal is zero"));
	}

	let used = total.saturating_sub(free).saturating_sub(buffers).saturating_sub(cached);
	let to_gb = |kb: u64| (kb * 1024) as f64 / BYTES_PER_GIB;
	let used_gb = to_gb(used);
	let cached_gb = to_gb(buffers + cached);

	Ok(MemorySample {
		percent_used: total.saturating_sub(available) as f64 / total as f64 * 100.0,
		used_gb,
		cached_gb,
		total_gb: used_gb + cached_gb,
	})
}

pub fn read_memory(proc_root: &Path) -> io::Result<MemorySample> {
	parse_meminfo(&fs::read_to_string(proc_root.join("meminfo"))?)
}
