use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Jiffy counters of a single logical CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuStats {
	pub user: u64,
	pub nice: u64,
	pub system: u64,
	pub idle: u64,
	pub iowait: u64,
	pub irq: u64,
	pub softirq: u64,
	pub steal: u64,
	pub total: u64,
}

/// Parses the per-thread `cpuN` lines of `/proc/stat`, skipping the aggregate `cpu` line
pub fn parse_proc_stat(contents: &str) -> BTreeMap<usize, CpuStats> {
	let mut stats = BTreeMap::new();

	for line in contents.lines() {
		if !line.starts_with("cpu") || line.starts_with("cpu ") {
			continue;
		}
		let parts: Vec<&str> = line.split_whitespace().collect();
		if parts.len() < 8 {
			continue;
		}
		let Ok(cpu_id) = parts[0][3..].parse::<usize>() else {
			continue;
		};
		let field = |i: usize| parts.get(i).and_then(|p| p.parse().ok()).unwrap_or(0);

		let mut cpu = CpuStats {
			user: field(1),
			nice: field(2),
			system: field(3),
			idle: field(4),
			iowait: field(5),
			irq: field(6),
			softirq: field(7),
			steal: field(8),
			total: 0,
		};
		cpu.total = cpu.user + cpu.nice + cpu.system + cpu.idle + cpu.iowait + cpu.irq + cpu.softirq + cpu.steal;
		stats.insert(cpu_id, cpu);
	}

	stats
}

/// Tracks per-thread CPU utilization between successive reads of `/proc/stat`
#[derive(Debug, Clone)]
pub struct CpuUtilization {
	stat_path: PathBuf,
	prev_stats: BTreeMap<usize, CpuStats>,
}

impl CpuUtilization {
	pub fn new(proc_root: &Path) -> Self {
		Self {
			stat_path: proc_root.join("stat"),
			prev_stats: BTreeMap::new(),
		}
	}

	/// Reads `/proc/stat` and returns each thread's busy percentage since the previous call
	///
	/// The first call has no baseline and reports 0 % for every thread.
	pub fn sample(&mut self) -> io::Result<Vec<f64>> {
		let contents = fs::read_to_string(&self.stat_path)?;
		Ok(self.update(parse_proc_stat(&contents)))
	}

	/// Folds new counters in, ordered by CPU id
	pub fn update(&mut self, new_stats: BTreeMap<usize, CpuStats>) -> Vec<f64> {
		let utilization = new_stats
			.iter()
			.map(|(cpu_id, current)| match self.prev_stats.get(cpu_id) {
				Some(prev) => {
					let total_diff = current.total.saturating_sub(prev.total);
					if total_diff == 0 {
						return 0.0;
					}
					let idle_diff = current.idle.saturating_sub(prev.idle) + current.iowait.saturating_sub(prev.iowait);
					(1.0 - idle_diff as f64 / total_diff as f64) * 100.0
				},
				None => 0.0,
			})
			.collect();

		self.prev_stats = new_stats;
		utilization
	}
}
