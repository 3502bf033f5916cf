use std::fs;
use std::io;
use std::time::{Duration, Instant};

use crate::domain::{DomainId, EnergySourceTree};
use crate::error::{CollectorError, Result};

/// Raw counter readings of every domain in a tree, taken in one pass
///
/// Readings are microjoules, indexed by [`DomainId`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySnapshot {
	readings: Vec<u64>,
	taken_at: Instant,
}

/// Energy consumed between two snapshots of the same tree
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementWindow {
	/// Clamped per-domain deltas in microjoules
	deltas: Vec<u64>,

	/// Domains whose counter went backwards during the window
	clamped: Vec<bool>,

	pub duration: Duration,
	pub ended_at: Instant,
}

fn is_root() -> bool {
	// SAFETY: geteuid has no preconditions and cannot fail
	unsafe { libc::geteuid() == 0 }
}

/// Reads one `energy_uj` file
fn read_counter(tree: &EnergySourceTree, id: DomainId) -> Result<u64> {
	let domain = tree.domain(id);
	let failure = |source: io::Error| {
		let hint = (source.kind() == io::ErrorKind::PermissionDenied && !is_root())
			.then_some("energy_uj is root-only on most kernels, run as root");
		CollectorError::CounterReadFailure {
			session: None,
			domain: domain.label.clone(),
			path: domain.energy_path.clone(),
			hint,
			source,
		}
	};

	let raw = fs::read_to_string(&domain.energy_path).map_err(|e| failure(e))?;
	raw.trim()
		.parse::<u64>()
		.map_err(|e| failure(io::Error::new(io::ErrorKind::InvalidData, e)))
}

impl EnergySnapshot {
	/// Reads every counter in `tree` and stamps the capture time
	pub fn capture(tree: &EnergySourceTree) -> Result<Self> {
		let readings = tree
			.iter()
			.map(|(id, _)| read_counter(tree, id))
			.collect::<Result<Vec<_>>>()?;

		Ok(Self {
			readings,
			taken_at: Instant::now(),
		})
	}

	/// Builds a snapshot from known readings
	pub fn from_readings(readings: Vec<u64>, taken_at: Instant) -> Self {
		Self { readings, taken_at }
	}

	pub fn get(&self, id: DomainId) -> u64 {
		self.readings[id.index()]
	}

	pub fn readings(&self) -> &[u64] {
		&self.readings
	}

	pub fn taken_at(&self) -> Instant {
		self.taken_at
	}
}

impl MeasurementWindow {
	/// Computes `max(0, end - begin)` for every domain
	///
	/// A counter that went backwards (reset or wraparound) contributes zero for this window;
	/// the energy consumed across the wrap is not reconstructed.
	pub fn between(begin: &EnergySnapshot, end: &EnergySnapshot) -> Self {
		debug_assert_eq!(begin.readings.len(), end.readings.len(), "snapshots of different trees");

		let (deltas, clamped) = begin
			.readings
			.iter()
			.zip(&end.readings)
			.map(|(&start, &stop)| match stop.checked_sub(start) {
				Some(delta) => (delta, false),
				None => (0, true),
			})
			.unzip();

		Self {
			deltas,
			clamped,
			duration: end.taken_at.saturating_duration_since(begin.taken_at),
			ended_at: end.taken_at,
		}
	}

	pub fn delta_uj(&self, id: DomainId) -> u64 {
		self.deltas[id.index()]
	}

	pub fn deltas_uj(&self) -> &[u64] {
		&self.deltas
	}

	pub fn was_clamped(&self, id: DomainId) -> bool {
		self.clamped[id.index()]
	}

	pub fn clamped(&self) -> &[bool] {
		&self.clamped
	}

	/// Zero-length windows carry no usable rate
	pub fn is_degenerate(&self) -> bool {
		self.duration.is_zero()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::FakePowercap;

	fn snapshot(readings: &[u64], at: Instant) -> EnergySnapshot {
		EnergySnapshot::from_readings(readings.to_vec(), at)
	}

	#[test]
	fn capture_reads_every_domain_in_handle_order() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 1_000_000);
		fake.subzone(0, 0, "dram", 200_000);
		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();

		let snap = EnergySnapshot::capture(&tree).unwrap();
		assert_eq!(snap.readings(), &[1_000_000, 200_000]);
		assert_eq!(snap.get(tree.find("dram").unwrap()), 200_000);
	}

	#[test]
	fn capture_reports_the_failing_domain() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 1);
		fake.subzone(0, 0, "dram", 1);
		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		fake.remove_counter(&[0, 0]);

		match EnergySnapshot::capture(&tree) {
			Err(CollectorError::CounterReadFailure { domain, .. }) => assert_eq!(domain, "dram"),
			other => panic!("expected counter failure, got {other:?}"),
		}
	}

	#[test]
	fn garbage_counter_contents_fail_the_read() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 1);
		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		fs::write(fake.zone_dir(&[0]).join("energy_uj"), "not a number").unwrap();

		assert!(matches!(
			EnergySnapshot::capture(&tree),
			Err(CollectorError::CounterReadFailure { .. })
		));
	}

	#[test]
	fn window_is_the_difference_of_readings() {
		let t0 = Instant::now();
		let begin = snapshot(&[1_000_000, 200_000], t0);
		let end = snapshot(&[1_050_000, 210_000], t0 + Duration::from_secs(1));

		let window = MeasurementWindow::between(&begin, &end);
		assert_eq!(window.deltas_uj(), &[50_000, 10_000]);
		assert_eq!(window.duration, Duration::from_secs(1));
		assert!(!window.clamped().iter().any(|&c| c));
	}

	#[test]
	fn counter_reset_yields_zero_not_negative() {
		let t0 = Instant::now();
		let begin = snapshot(&[1_050_000, 5], t0);
		let end = snapshot(&[500_000, 9], t0 + Duration::from_millis(100));

		let window = MeasurementWindow::between(&begin, &end);
		assert_eq!(window.delta_uj(DomainId(0)), 0);
		assert!(window.was_clamped(DomainId(0)));
		assert_eq!(window.delta_uj(DomainId(1)), 4);
		assert!(!window.was_clamped(DomainId(1)));
	}

	#[test]
	fn same_instant_window_is_degenerate() {
		let t0 = Instant::now();
		let window = MeasurementWindow::between(&snapshot(&[1], t0), &snapshot(&[2], t0));
		assert!(window.is_degenerate());
	}
}
