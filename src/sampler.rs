use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::accumulator::{RunAccumulator, RunResults};
use crate::config::SamplerConfig;
use crate::domain::EnergySourceTree;
use crate::energy::{EnergySnapshot, MeasurementWindow};
use crate::error::{CollectorError, Result};
use crate::resources::{ProcResourceProbe, ResourceProbe, ResourceSample};

/// Lifecycle of a sampler; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
	Idle,
	Running,
	Stopped,
}

impl SamplerState {
	pub fn as_str(&self) -> &'static str {
		match self {
			SamplerState::Idle => "idle",
			SamplerState::Running => "running",
			SamplerState::Stopped => "stopped",
		}
	}
}

/// Time still to wait so that at least `threshold` separates two counter reads
pub fn settle_delay(since_last: Duration, threshold: Duration) -> Duration {
	threshold.saturating_sub(since_last)
}

/// State shared with the background thread, guarded by one mutex
struct Session {
	acc: RunAccumulator,
	/// Snapshot closing the most recent window
	boundary: Option<EnergySnapshot>,
	failure: Option<CollectorError>,
	ticks: usize,
}

struct Shared {
	session: Mutex<Session>,
	probe: Mutex<Box<dyn ResourceProbe>>,
}

impl Shared {
	fn sample_resources(&self) -> Result<ResourceSample> {
		self.probe
			.lock()
			.sample()
			.map_err(|source| CollectorError::ResourceProbe { session: None, source })
	}

	/// Closes the current window at `snapshot` and records `sample`
	fn fold(&self, snapshot: EnergySnapshot, sample: ResourceSample, from_tick: bool) -> usize {
		let mut session = self.session.lock();
		if from_tick {
			session.ticks += 1;
		}
		if let Some(previous) = session.boundary.as_ref() {
			let window = MeasurementWindow::between(previous, &snapshot);
			session.acc.fold(&window);
		}
		session.acc.record(sample);
		session.boundary = Some(snapshot);
		session.acc.windows()
	}

	/// One background tick: read counters and procfs first, then lock only to accumulate
	fn tick(&self, tree: &EnergySourceTree) -> Result<()> {
		let snapshot = EnergySnapshot::capture(tree)?;
		let sample = self.sample_resources()?;
		let windows = self.fold(snapshot, sample, true);
		debug!(windows, "sampler tick");
		Ok(())
	}
}

struct Worker {
	stop_tx: mpsc::Sender<()>,
	handle: JoinHandle<()>,
}

impl Worker {
	/// Signals the thread and waits for any in-flight tick to finish
	fn quiesce(self) {
		drop(self.stop_tx);
		if let Err(panic) = self.handle.join() {
			std::panic::resume_unwind(panic);
		}
	}
}

/// Samples energy counters and resource usage in the background for one session
///
/// A sampler is single-use: `start` once, `stop` once.
pub struct PeriodicSampler {
	label: String,
	tree: Arc<EnergySourceTree>,
	config: SamplerConfig,
	state: SamplerState,
	shared: Arc<Shared>,
	worker: Option<Worker>,
}

impl PeriodicSampler {
	/// Creates a sampler reading memory and CPU usage from `config.proc_root`
	pub fn new(label: impl Into<String>, tree: Arc<EnergySourceTree>, config: SamplerConfig) -> Self {
		let probe = ProcResourceProbe::new(&config.proc_root);
		Self::with_probe(label, tree, config, Box::new(probe))
	}

	pub fn with_probe(
		label: impl Into<String>,
		tree: Arc<EnergySourceTree>,
		config: SamplerConfig,
		probe: Box<dyn ResourceProbe>,
	) -> Self {
		let shared = Arc::new(Shared {
			session: Mutex::new(Session {
				acc: RunAccumulator::new(Arc::clone(&tree)),
				boundary: None,
				failure: None,
				ticks: 0,
			}),
			probe: Mutex::new(probe),
		});

		Self {
			label: label.into(),
			tree,
			config,
			state: SamplerState::Idle,
			shared,
			worker: None,
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn state(&self) -> SamplerState {
		self.state
	}

	/// Number of background ticks folded so far
	pub fn ticks(&self) -> usize {
		self.shared.session.lock().ticks
	}

	/// Takes the baseline snapshot and first resource sample, then launches the ticker
	pub fn start(&mut self) -> Result<()> {
		if self.state != SamplerState::Idle {
			return Err(CollectorError::InvalidStateTransition {
				operation: "start",
				state: self.state.as_str(),
			});
		}

		let baseline = EnergySnapshot::capture(&self.tree).map_err(|e| e.in_session(&self.label))?;
		let sample = self.shared.sample_resources().map_err(|e| e.in_session(&self.label))?;
		{
			let mut session = self.shared.session.lock();
			session.acc.reset();
			session.failure = None;
			session.ticks = 0;
			session.boundary = None;
		}
		self.shared.fold(baseline, sample, false);

		let (stop_tx, stop_rx) = mpsc::channel::<()>();
		let shared = Arc::clone(&self.shared);
		let tree = Arc::clone(&self.tree);
		let interval = self.config.interval;
		let label = self.label.clone();

		let handle = thread::spawn(move || {
			loop {
				match stop_rx.recv_timeout(interval) {
					Err(RecvTimeoutError::Timeout) => {
						if let Err(e) = shared.tick(&tree) {
							error!(session = %label, error = %e, "sampling tick failed, aborting session");
							shared.session.lock().failure = Some(e);
							break;
						}
					},
					Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
				}
			}
		});

		self.worker = Some(Worker { stop_tx, handle });
		self.state = SamplerState::Running;
		info!(session = %self.label, interval = ?interval, "measurement started");
		Ok(())
	}

	/// Quiesces the ticker, folds the final window and returns the frozen totals
	///
	/// Blocks for whatever remains of the settle threshold since the last snapshot, so the
	/// final read never lands before the counters have had time to update. A failure from a
	/// background tick is returned here and no results are produced.
	pub fn stop(&mut self) -> Result<RunResults> {
		if self.state != SamplerState::Running {
			return Err(CollectorError::InvalidStateTransition {
				operation: "stop",
				state: self.state.as_str(),
			});
		}
		self.state = SamplerState::Stopped;

		if let Some(worker) = self.worker.take() {
			worker.quiesce();
		}

		let last_read = {
			let mut session = self.shared.session.lock();
			if let Some(failure) = session.failure.take() {
				return Err(failure.in_session(&self.label));
			}
			session.boundary.as_ref().map(EnergySnapshot::taken_at)
		};

		if let Some(last_read) = last_read {
			let wait = settle_delay(last_read.elapsed(), self.config.settle_threshold);
			if !wait.is_zero() {
				thread::sleep(wait);
			}
		}

		let snapshot = EnergySnapshot::capture(&self.tree).map_err(|e| e.in_session(&self.label))?;
		let sample = self.shared.sample_resources().map_err(|e| e.in_session(&self.label))?;
		self.shared.fold(snapshot, sample, false);

		let results = {
			let mut session = self.shared.session.lock();
			let fresh = RunAccumulator::new(Arc::clone(&self.tree));
			std::mem::replace(&mut session.acc, fresh).freeze(self.label.clone())
		};

		info!(
			session = %self.label,
			duration_s = results.duration.as_secs_f64(),
			windows = results.windows,
			package_j = results.package_energy_j,
			memory_j = results.memory_energy_j,
			"measurement stopped"
		);
		Ok(results)
	}

	/// Time since the most recent snapshot, if any was taken
	pub fn since_last_snapshot(&self) -> Option<Duration> {
		self.shared
			.session
			.lock()
			.boundary
			.as_ref()
			.map(|s| Instant::now().saturating_duration_since(s.taken_at()))
	}
}

impl Drop for PeriodicSampler {
	fn drop(&mut self) {
		if let Some(worker) = self.worker.take() {
			drop(worker.stop_tx);
			let _ = worker.handle.join();
		}
	}
}
