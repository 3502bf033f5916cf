use std::io::{self, Write};

use crate::domain::DomainKind;
use crate::stats::RunStats;

/// Writes a human-readable summary of one session
pub fn display_run_stats(stats: &RunStats, out: &mut impl Write) -> io::Result<()> {
	writeln!(out, "Results for {}:", stats.label)?;

	if stats.memory_energy_j != 0.0 {
		writeln!(out, "  DRAM total energy:   {:10.4} J", stats.memory_energy_j)?;
		writeln!(out, "  DRAM average power:  {:10.4} W", stats.memory_avg_power_w)?;
		writeln!(out, "  DRAM carbon:         {:10.6} gCO₂eq", stats.memory_carbon_g)?;
	}
	writeln!(out, "  CPU total energy:    {:10.4} J", stats.package_energy_j)?;
	writeln!(out, "  CPU average power:   {:10.4} W", stats.package_avg_power_w)?;
	writeln!(out, "  CPU carbon:          {:10.6} gCO₂eq", stats.package_carbon_g)?;

	for domain in stats.domains.iter().filter(|d| d.kind == DomainKind::Package) {
		writeln!(
			out,
			"  {:<20} {:10.4} J {:8.3} W {:10.6} gCO₂eq",
			domain.label, domain.total_energy_j, domain.avg_power_w, domain.carbon_g
		)?;
	}

	for domain in stats.domains.iter().filter(|d| d.clamped_windows > 0) {
		writeln!(
			out,
			"  warning: {} counter reset in {} window(s), energy undercounted",
			domain.label, domain.clamped_windows
		)?;
	}

	writeln!(out, "  Duration: {:.3} s | Latency: {:.3} s", stats.duration_s, stats.latency_s)?;

	if let (Some(used), Some(cached)) = (stats.resources.mem_used_gb.last(), stats.resources.mem_cached_gb.last()) {
		writeln!(out, "  Memory: {used:.2} GB used, {cached:.2} GB cache")?;
	}

	for (device, io) in &stats.io {
		writeln!(
			out,
			"  {device}: {} reads ({} B), {} writes ({} B), busy {} ms",
			io.read_count, io.read_bytes, io.write_count, io.write_bytes, io.busy_time_ms
		)?;
	}

	out.flush()
}
