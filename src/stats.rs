use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::accumulator::{ResourceSeries, RunResults};
use crate::carbon::CarbonIntensity;
use crate::domain::DomainKind;
use crate::util::disk::{IoCounters, filter_non_zero};

/// Totals of one energy domain over a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStats {
	pub label: String,
	pub kind: DomainKind,
	/// Label of the owning package for subdomains
	pub parent: Option<String>,
	pub total_energy_j: f64,
	pub avg_power_w: f64,
	pub carbon_g: f64,
	/// Windows in which the counter went backwards and was counted as zero
	pub clamped_windows: u32,
}

/// One output record per measured session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
	pub label: String,
	pub domains: Vec<DomainStats>,

	pub package_energy_j: f64,
	pub package_avg_power_w: f64,
	pub package_carbon_g: f64,
	pub memory_energy_j: f64,
	pub memory_avg_power_w: f64,
	pub memory_carbon_g: f64,

	pub duration_s: f64,
	pub latency_s: f64,
	pub carbon_intensity_g_per_kwh: f64,

	pub resources: ResourceSeries,

	/// Devices with at least one non-zero counter
	pub io: BTreeMap<String, IoCounters>,
}

impl RunStats {
	/// Looks a domain up by its label
	pub fn domain(&self, label: &str) -> Option<&DomainStats> {
		self.domains.iter().find(|d| d.label == label)
	}
}

/// Combines a finished session with its externally measured latency and I/O
pub fn aggregate(
	results: &RunResults,
	io_delta_by_device: &BTreeMap<String, IoCounters>,
	latency: Duration,
	intensity: CarbonIntensity,
) -> RunStats {
	let tree = results.tree();

	let domains = tree
		.iter()
		.map(|(id, domain)| {
			let energy = results.energy_j(id);
			DomainStats {
				label: domain.label.clone(),
				kind: domain.kind,
				parent: domain.parent.map(|p| tree.domain(p).label.clone()),
				total_energy_j: energy,
				avg_power_w: results.avg_power_w(id),
				carbon_g: intensity.emissions_g(energy),
				clamped_windows: results.clamped_windows(id),
			}
		})
		.collect();

	RunStats {
		label: results.label.clone(),
		domains,
		package_energy_j: results.package_energy_j,
		package_avg_power_w: results.avg_package_power_w,
		package_carbon_g: intensity.emissions_g(results.package_energy_j),
		memory_energy_j: results.memory_energy_j,
		memory_avg_power_w: results.avg_memory_power_w,
		memory_carbon_g: intensity.emissions_g(results.memory_energy_j),
		duration_s: results.duration.as_secs_f64(),
		latency_s: latency.as_secs_f64(),
		carbon_intensity_g_per_kwh: intensity.g_per_kwh(),
		resources: results.series.clone(),
		io: filter_non_zero(io_delta_by_device),
	}
}
