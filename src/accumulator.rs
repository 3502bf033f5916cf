use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::domain::{DomainId, DomainKind, EnergySourceTree};
use crate::energy::MeasurementWindow;
use crate::resources::ResourceSample;
use crate::util::{average_power_w, uj_to_joules};

/// Memory and CPU time series, one entry per sample point
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSeries {
	pub mem_percent: Vec<f64>,
	pub mem_used_gb: Vec<f64>,
	pub mem_cached_gb: Vec<f64>,
	pub mem_total_gb: Vec<f64>,
	/// Per-thread busy percentage at each sample point
	pub cpu_percent: Vec<Vec<f64>>,
}

impl ResourceSeries {
	pub fn push(&mut self, sample: ResourceSample) {
		self.mem_percent.push(sample.memory.percent_used);
		self.mem_used_gb.push(sample.memory.used_gb);
		self.mem_cached_gb.push(sample.memory.cached_gb);
		self.mem_total_gb.push(sample.memory.total_gb);
		self.cpu_percent.push(sample.cpu_percent);
	}

	pub fn len(&self) -> usize {
		self.mem_percent.len()
	}

	pub fn is_empty(&self) -> bool {
		self.mem_percent.is_empty()
	}
}

/// Running totals of one measurement session
#[derive(Debug, Clone)]
pub struct RunAccumulator {
	tree: Arc<EnergySourceTree>,
	energy_j: Vec<f64>,
	clamped_windows: Vec<u32>,
	duration: Duration,
	windows: usize,
	last_window_end: Option<Instant>,
	avg_package_power_w: f64,
	avg_memory_power_w: f64,
	series: ResourceSeries,
}

impl RunAccumulator {
	pub fn new(tree: Arc<EnergySourceTree>) -> Self {
		let n = tree.len();
		Self {
			tree,
			energy_j: vec![0.0; n],
			clamped_windows: vec![0; n],
			duration: Duration::ZERO,
			windows: 0,
			last_window_end: None,
			avg_package_power_w: 0.0,
			avg_memory_power_w: 0.0,
			series: ResourceSeries::default(),
		}
	}

	/// Zeroes all totals and series
	pub fn reset(&mut self) {
		*self = Self::new(Arc::clone(&self.tree));
	}

	/// Adds one window's clamped deltas to the totals and recomputes the averages
	pub fn fold(&mut self, window: &MeasurementWindow) {
		for (id, domain) in self.tree.iter() {
			self.energy_j[id.index()] += uj_to_joules(window.delta_uj(id));
			if window.was_clamped(id) {
				self.clamped_windows[id.index()] += 1;
				warn!(
					domain = %domain.label,
					range_uj = ?domain.max_energy_range_uj,
					"energy counter went backwards, window counted as zero"
				);
			}
		}
		self.duration += window.duration;
		self.windows += 1;
		self.last_window_end = Some(window.ended_at);

		self.avg_package_power_w = average_power_w(self.kind_energy_j(DomainKind::Package), self.duration);
		self.avg_memory_power_w = average_power_w(self.kind_energy_j(DomainKind::Memory), self.duration);
	}

	pub fn record(&mut self, sample: ResourceSample) {
		self.series.push(sample);
	}

	pub fn energy_j(&self, id: DomainId) -> f64 {
		self.energy_j[id.index()]
	}

	pub fn duration(&self) -> Duration {
		self.duration
	}

	pub fn windows(&self) -> usize {
		self.windows
	}

	pub fn last_window_end(&self) -> Option<Instant> {
		self.last_window_end
	}

	pub fn avg_package_power_w(&self) -> f64 {
		self.avg_package_power_w
	}

	pub fn avg_memory_power_w(&self) -> f64 {
		self.avg_memory_power_w
	}

	pub fn series(&self) -> &ResourceSeries {
		&self.series
	}

	fn kind_energy_j(&self, kind: DomainKind) -> f64 {
		self.tree
			.iter()
			.filter(|(_, d)| d.kind == kind)
			.map(|(id, _)| self.energy_j[id.index()])
			.sum()
	}

	/// Consumes the accumulator into its read-only results
	pub fn freeze(self, label: impl Into<String>) -> RunResults {
		RunResults {
			label: label.into(),
			ended_at: self.last_window_end,
			package_energy_j: self.kind_energy_j(DomainKind::Package),
			memory_energy_j: self.kind_energy_j(DomainKind::Memory),
			tree: self.tree,
			energy_j: self.energy_j,
			clamped_windows: self.clamped_windows,
			duration: self.duration,
			windows: self.windows,
			avg_package_power_w: self.avg_package_power_w,
			avg_memory_power_w: self.avg_memory_power_w,
			series: self.series,
		}
	}
}

/// Frozen totals of a finished session
#[derive(Debug, Clone)]
pub struct RunResults {
	/// Session label (query name, `load`, `idle state`, ...)
	pub label: String,
	tree: Arc<EnergySourceTree>,
	energy_j: Vec<f64>,
	clamped_windows: Vec<u32>,
	pub duration: Duration,
	/// End of the last folded window
	pub ended_at: Option<Instant>,
	/// Windows folded in, ticks plus the final one
	pub windows: usize,
	pub package_energy_j: f64,
	pub memory_energy_j: f64,
	pub avg_package_power_w: f64,
	pub avg_memory_power_w: f64,
	pub series: ResourceSeries,
}

impl RunResults {
	pub fn tree(&self) -> &EnergySourceTree {
		&self.tree
	}

	pub fn energy_j(&self, id: DomainId) -> f64 {
		self.energy_j[id.index()]
	}

	pub fn avg_power_w(&self, id: DomainId) -> f64 {
		average_power_w(self.energy_j(id), self.duration)
	}

	pub fn clamped_windows(&self, id: DomainId) -> u32 {
		self.clamped_windows[id.index()]
	}
}
