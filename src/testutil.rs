//! Fake sysfs/procfs trees for unit tests

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::constants::{ENERGY_FILE, NAME_FILE, ZONE_PREFIX};

pub struct FakePowercap {
	dir: TempDir,
}

impl FakePowercap {
	pub fn new() -> Self {
		Self {
			dir: tempfile::tempdir().unwrap(),
		}
	}

	pub fn root(&self) -> &Path {
		self.dir.path()
	}

	/// `&[zone]` or `&[zone, subzone]`
	pub fn zone_dir(&self, path: &[u32]) -> PathBuf {
		match path {
			[zone] => self.root().join(format!("{ZONE_PREFIX}:{zone}")),
			[zone, sub] => self
				.zone_dir(&[*zone])
				.join(format!("{ZONE_PREFIX}:{zone}:{sub}")),
			_ => panic!("bad zone path {path:?}"),
		}
	}

	pub fn zone(&self, zone: u32, name: &str, uj: u64) {
		self.create(&[zone], name, uj);
	}

	pub fn subzone(&self, zone: u32, sub: u32, name: &str, uj: u64) {
		self.create(&[zone, sub], name, uj);
	}

	/// Replaces the counter atomically so a concurrent tick never sees a half-written file
	pub fn set(&self, path: &[u32], uj: u64) {
		let dir = self.zone_dir(path);
		let tmp = dir.join("energy_uj.tmp");
		fs::write(&tmp, format!("{uj}\n")).unwrap();
		fs::rename(tmp, dir.join(ENERGY_FILE)).unwrap();
	}

	pub fn remove_counter(&self, path: &[u32]) {
		fs::remove_file(self.zone_dir(path).join(ENERGY_FILE)).unwrap();
	}

	fn create(&self, path: &[u32], name: &str, uj: u64) {
		let dir = self.zone_dir(path);
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join(NAME_FILE), format!("{name}\n")).unwrap();
		self.set(path, uj);
	}
}

pub const MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         4096000 kB
MemAvailable:    8192000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SReclaimable:     512000 kB
";

pub const STAT: &str = "\
cpu  200 0 100 700 0 0 0 0 0 0
cpu0 100 0 50 350 0 0 0 0 0 0
cpu1 100 0 50 350 0 0 0 0 0 0
intr 12345
";

pub struct FakeProc {
	dir: TempDir,
}

impl FakeProc {
	pub fn new() -> Self {
		let fake = Self {
			dir: tempfile::tempdir().unwrap(),
		};
		fake.write("meminfo", MEMINFO);
		fake.write("stat", STAT);
		fake
	}

	pub fn root(&self) -> &Path {
		self.dir.path()
	}

	pub fn write(&self, file: &str, contents: &str) {
		fs::write(self.root().join(file), contents).unwrap();
	}
}
