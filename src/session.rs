use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::accumulator::RunResults;
use crate::config::SamplerConfig;
use crate::domain::EnergySourceTree;
use crate::error::Result;
use crate::sampler::PeriodicSampler;

/// Output of a measured unit of work
#[derive(Debug)]
pub struct Measured<T> {
	pub output: T,
	/// Wall-clock time spent inside the work itself
	pub latency: Duration,
	pub results: RunResults,
}

/// Runs `work` between `start` and `stop` of a fresh sampler
///
/// The work is opaque: a query, a bulk load, anything the driver wants bracketed.
/// If measurement fails the work's output is dropped along with the session.
pub fn measure<T, F>(tree: Arc<EnergySourceTree>, config: &SamplerConfig, label: &str, work: F) -> Result<Measured<T>>
where
	F: FnOnce() -> T,
{
	let mut sampler = PeriodicSampler::new(label, tree, config.clone());
	sampler.start()?;

	let begin = Instant::now();
	let output = work();
	let latency = begin.elapsed();

	let results = sampler.stop()?;
	Ok(Measured {
		output,
		latency,
		results,
	})
}

pub const IDLE_LABEL: &str = "idle state";

/// Measures the idle baseline: the machine doing nothing for `duration`
pub fn measure_idle(tree: Arc<EnergySourceTree>, config: &SamplerConfig, duration: Duration) -> Result<RunResults> {
	info!(seconds = duration.as_secs_f64(), "measuring idle energy consumption");
	measure(tree, config, IDLE_LABEL, || thread::sleep(duration)).map(|m| m.results)
}
