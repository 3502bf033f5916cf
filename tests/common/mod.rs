#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use db_energy::{EnergySourceTree, SamplerConfig};
use tempfile::TempDir;

/// A powercap tree and procfs mount living in one temp directory
pub struct FakeMachine {
	dir: TempDir,
}

impl FakeMachine {
	/// `package-0` with a `dram` subzone, plus a minimal procfs
	pub fn new(package_uj: u64, dram_uj: u64) -> Self {
		let machine = Self {
			dir: tempfile::tempdir().unwrap(),
		};
		machine.add_zone("intel-rapl:0", "package-0", package_uj);
		machine.add_zone("intel-rapl:0/intel-rapl:0:0", "dram", dram_uj);

		fs::create_dir_all(machine.proc_root()).unwrap();
		fs::write(
			machine.proc_root().join("meminfo"),
			"MemTotal: 8000000 kB\nMemFree: 2000000 kB\nMemAvailable: 4000000 kB\nBuffers: 100000 kB\nCached: 900000 kB\n",
		)
		.unwrap();
		fs::write(machine.proc_root().join("stat"), "cpu  1 0 1 8\ncpu0 1 0 1 8 0 0 0 0\n").unwrap();
		machine
	}

	pub fn powercap_root(&self) -> PathBuf {
		self.dir.path().join("powercap")
	}

	pub fn proc_root(&self) -> PathBuf {
		self.dir.path().join("proc")
	}

	pub fn add_zone(&self, rel: &str, name: &str, uj: u64) {
		let dir = self.powercap_root().join(rel);
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join("name"), format!("{name}\n")).unwrap();
		write_counter(&dir, uj);
	}

	pub fn set_package(&self, uj: u64) {
		write_counter(&self.powercap_root().join("intel-rapl:0"), uj);
	}

	pub fn set_dram(&self, uj: u64) {
		write_counter(&self.powercap_root().join("intel-rapl:0/intel-rapl:0:0"), uj);
	}

	pub fn tree(&self) -> Arc<EnergySourceTree> {
		Arc::new(EnergySourceTree::discover_at(self.powercap_root()).unwrap())
	}

	pub fn config(&self, interval: Duration) -> SamplerConfig {
		SamplerConfig {
			interval,
			powercap_root: self.powercap_root(),
			proc_root: self.proc_root(),
			..SamplerConfig::default()
		}
	}
}

fn write_counter(dir: &Path, uj: u64) {
	let tmp = dir.join("energy_uj.tmp");
	fs::write(&tmp, format!("{uj}\n")).unwrap();
	fs::rename(tmp, dir.join("energy_uj")).unwrap();
}
