use std::error::Error;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use db_energy::config::parse_u64;
use db_energy::constants::{DEFAULT_IDLE_SECS, ENV_IDLE_SECS, POWERCAP_ROOT};
use db_energy::display::display_run_stats;
use db_energy::{
	CarbonIntensity, EnergySourceTree, EnvIntensity, SamplerConfig, aggregate, io_delta, measure_idle,
	read_disk_counters, refresh,
};

/// Measures the idle baseline of this machine and prints it
fn run() -> Result<(), Box<dyn Error>> {
	let config = SamplerConfig::from_env()?;
	let idle_secs = match std::env::var(ENV_IDLE_SECS) {
		Ok(raw) => parse_u64(ENV_IDLE_SECS, &raw)?,
		Err(_) => DEFAULT_IDLE_SECS,
	};

	let tree = if config.powercap_root == Path::new(POWERCAP_ROOT) {
		EnergySourceTree::discover()?
	} else {
		Arc::new(EnergySourceTree::discover_at(&config.powercap_root)?)
	};
	println!("Discovered {} energy domain(s) under {}", tree.len(), tree.root().display());

	let intensity = refresh(&EnvIntensity::default()).unwrap_or_else(|e| {
		warn!(error = %e, "no carbon intensity available, reporting zero emissions");
		CarbonIntensity::default()
	});

	// Disk counters are best effort; the energy measurement does not depend on them
	let disks_before = read_disk_counters(&config.proc_root).unwrap_or_default();
	let results = measure_idle(tree, &config, Duration::from_secs(idle_secs))?;
	let disks_after = read_disk_counters(&config.proc_root).unwrap_or_default();

	let latency = results.duration;
	let stats = aggregate(&results, &io_delta(&disks_before, &disks_after), latency, intensity);

	display_run_stats(&stats, &mut io::stdout().lock())?;
	Ok(())
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_target(false)
		.init();

	match run() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			ExitCode::FAILURE
		},
	}
}
