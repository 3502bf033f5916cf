use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::constants::DISK_SECTOR_BYTES;

/// Cumulative I/O counters of one block device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IoCounters {
	pub read_count: u64,
	pub write_count: u64,
	pub read_bytes: u64,
	pub write_bytes: u64,
	pub read_time_ms: u64,
	pub write_time_ms: u64,
	pub read_merged_count: u64,
	pub write_merged_count: u64,
	pub busy_time_ms: u64,
}

impl IoCounters {
	/// Field-wise `self - earlier`, saturating at zero
	pub fn since(&self, earlier: &IoCounters) -> IoCounters {
		IoCounters {
			read_count: self.read_count.saturating_sub(earlier.read_count),
			write_count: self.write_count.saturating_sub(earlier.write_count),
			read_bytes: self.read_bytes.saturating_sub(earlier.read_bytes),
			write_bytes: self.write_bytes.saturating_sub(earlier.write_bytes),
			read_time_ms: self.read_time_ms.saturating_sub(earlier.read_time_ms),
			write_time_ms: self.write_time_ms.saturating_sub(earlier.write_time_ms),
			read_merged_count: self.read_merged_count.saturating_sub(earlier.read_merged_count),
			write_merged_count: self.write_merged_count.saturating_sub(earlier.write_merged_count),
			busy_time_ms: self.busy_time_ms.saturating_sub(earlier.busy_time_ms),
		}
	}

	pub fn is_zero(&self) -> bool {
		*self == IoCounters::default()
	}
}

/// Parses `/proc/diskstats` into per-device counters
pub fn parse_diskstats(contents: &str) -> BTreeMap<String, IoCounters> {
	contents
		.lines()
		.filter_map(|line| {
			let parts: Vec<&str> = line.split_whitespace().collect();
			if parts.len() < 14 {
				return None;
			}
			let field = |i: usize| parts[i].parse::<u64>().unwrap_or(0);
			Some((
				parts[2].to_string(),
				IoCounters {
					read_count: field(3),
					read_merged_count: field(4),
					read_bytes: field(5).saturating_mul(DISK_SECTOR_BYTES),
					read_time_ms: field(6),
					write_count: field(7),
					write_merged_count: field(8),
					write_bytes: field(9).saturating_mul(DISK_SECTOR_BYTES),
					write_time_ms: field(10),
					busy_time_ms: field(12),
				},
			))
		})
		.collect()
}

pub fn read_disk_counters(proc_root: &Path) -> io::Result<BTreeMap<String, IoCounters>> {
	Ok(parse_diskstats(&fs::read_to_string(proc_root.join("diskstats"))?))
}

/// Per-device difference between two counter snapshots
///
/// Devices that appeared after `before` was taken are diffed against zero.
pub fn io_delta(
	before: &BTreeMap<String, IoCounters>,
	after: &BTreeMap<String, IoCounters>,
) -> BTreeMap<String, IoCounters> {
	after
		.iter()
		.map(|(device, end)| {
			let start = before.get(device).copied().unwrap_or_default();
			(device.clone(), end.since(&start))
		})
		.collect()
}

/// Drops devices that saw no I/O at all
pub fn filter_non_zero(delta: &BTreeMap<String, IoCounters>) -> BTreeMap<String, IoCounters> {
	delta
		.iter()
		.filter(|(_, counters)| !counters.is_zero())
		.map(|(device, counters)| (device.clone(), *counters))
		.collect()
}
