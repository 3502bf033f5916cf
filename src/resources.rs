use std::io;
use std::path::{Path, PathBuf};

use crate::util::cpu::CpuUtilization;
use crate::util::mem::{MemorySample, read_memory};

/// OS-level resource usage recorded alongside every energy window
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceSample {
	pub memory: MemorySample,

	/// Busy percentage per logical CPU since the previous sample, ordered by CPU id
	pub cpu_percent: Vec<f64>,
}

/// Source of memory and CPU samples for a [`PeriodicSampler`](crate::sampler::PeriodicSampler)
pub trait ResourceProbe: Send {
	fn sample(&mut self) -> io::Result<ResourceSample>;
}

/// Reads `meminfo` and `stat` from a procfs mount
#[derive(Debug, Clone)]
pub struct ProcResourceProbe {
	proc_root: PathBuf,
	cpu: CpuUtilization,
}

impl ProcResourceProbe {
	pub fn new(proc_root: impl AsRef<Path>) -> Self {
		let proc_root = proc_root.as_ref().to_path_buf();
		Self {
			cpu: CpuUtilization::new(&proc_root),
			proc_root,
		}
	}
}

impl ResourceProbe for ProcResourceProbe {
	fn sample(&mut self) -> io::Result<ResourceSample> {
		let memory = read_memory(&self.proc_root)?;
		let mut cpu_percent = self.cpu.sample()?;
		// Containers can hide cpuN lines; keep one column per logical CPU
		if cpu_percent.is_empty() {
			cpu_percent = vec![0.0; num_cpus::get()];
		}
		Ok(ResourceSample { memory, cpu_percent })
	}
}
