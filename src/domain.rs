use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{info, warn};

use crate::constants::{ENERGY_FILE, MAX_ENERGY_RANGE_FILE, MEMORY_MARKER, NAME_FILE, PACKAGE_MARKER, POWERCAP_ROOT, ZONE_PREFIX};
use crate::error::{CollectorError, Result};

/// Stable handle to a domain inside an [`EnergySourceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(pub(crate) usize);

impl DomainId {
	pub fn index(self) -> usize {
		self.0
	}
}

/// What a domain measures, as far as aggregation is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DomainKind {
	/// A CPU socket (`package-N`)
	Package,
	/// The DRAM subdomain of a package
	Memory,
	/// Anything else the platform exposes (core, uncore, psys, ...)
	Other,
}

/// One hardware energy counter
#[derive(Debug, Clone)]
pub struct EnergyDomain {
	/// Contents of the zone's `name` file
	pub name: String,

	/// Column label; equals `name` unless another domain shares it
	pub label: String,

	pub kind: DomainKind,
	pub parent: Option<DomainId>,

	/// Zone and subzone numbers parsed from the directory name
	pub zone: u32,
	pub subzone: Option<u32>,

	pub energy_path: PathBuf,

	/// Counter wrap point, when the platform reports it
	pub max_energy_range_uj: Option<u64>,
}

/// The discovered hierarchy of energy counters
#[derive(Debug, Clone)]
pub struct EnergySourceTree {
	root: PathBuf,
	domains: Vec<EnergyDomain>,
}

static DEFAULT_TREE: OnceLock<Arc<EnergySourceTree>> = OnceLock::new();

/// Parses `intel-rapl:<zone>` into the zone number
fn parse_zone_dir(name: &str) -> Option<u32> {
	let mut parts = name.split(':');
	let (prefix, zone) = (parts.next()?, parts.next()?);
	if parts.next().is_some() || prefix != ZONE_PREFIX || !is_numeric(zone) {
		return None;
	}
	zone.parse().ok()
}

/// Parses `intel-rapl:<zone>:<subzone>` into the zone and subzone numbers
fn parse_subzone_dir(name: &str) -> Option<(u32, u32)> {
	let parts: Vec<&str> = name.split(':').collect();
	if parts.len() != 3 || parts[0] != ZONE_PREFIX || !parts[1..].iter().all(|p| is_numeric(p)) {
		return None;
	}
	Some((parts[1].parse().ok()?, parts[2].parse().ok()?))
}

fn is_numeric(part: &str) -> bool {
	!part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// Lists `(number, path)` of child directories accepted by `parse`, sorted by number
fn scan_dirs<T: Ord + Copy>(dir: &Path, parse: impl Fn(&str) -> Option<T>) -> Result<Vec<(T, PathBuf)>> {
	let entries = fs::read_dir(dir).map_err(|e| CollectorError::HardwareUnavailable {
		path: dir.to_path_buf(),
		reason: e.to_string(),
	})?;

	let mut found = Vec::new();
	for entry in entries.filter_map(std::result::Result::ok) {
		let path = entry.path();
		if !path.is_dir() {
			continue;
		}
		let file_name = entry.file_name();
		if let Some(key) = parse(&file_name.to_string_lossy()) {
			found.push((key, path));
		}
	}
	found.sort_by_key(|(key, _)| *key);
	Ok(found)
}

fn read_name(zone_dir: &Path) -> Result<String> {
	let path = zone_dir.join(NAME_FILE);
	fs::read_to_string(&path)
		.map(|s| s.trim().to_string())
		.map_err(|e| CollectorError::HardwareUnavailable {
			path,
			reason: format!("name file not readable: {e}"),
		})
}

fn require_energy_file(zone_dir: &Path, name: &str) -> Result<PathBuf> {
	let path = zone_dir.join(ENERGY_FILE);
	if !path.is_file() {
		return Err(CollectorError::HardwareUnavailable {
			path,
			reason: format!("energy file not found for `{name}`"),
		});
	}
	Ok(path)
}

fn read_max_range(zone_dir: &Path) -> Option<u64> {
	let path = zone_dir.join(MAX_ENERGY_RANGE_FILE);
	match fs::read_to_string(&path) {
		Ok(raw) => raw.trim().parse().ok(),
		Err(e) => {
			if e.kind() != std::io::ErrorKind::NotFound {
				warn!(path = %path.display(), error = %e, "could not read counter range");
			}
			None
		},
	}
}

impl EnergySourceTree {
	/// Discovers the counters under the default powercap root, once per process
	pub fn discover() -> Result<Arc<Self>> {
		if let Some(tree) = DEFAULT_TREE.get() {
			return Ok(Arc::clone(tree));
		}
		let tree = Arc::new(Self::discover_at(POWERCAP_ROOT)?);
		Ok(Arc::clone(DEFAULT_TREE.get_or_init(|| tree)))
	}

	/// Scans `root` for `intel-rapl:<n>` zones and their `intel-rapl:<n>:<m>` subzones
	pub fn discover_at(root: impl AsRef<Path>) -> Result<Self> {
		let root = root.as_ref();
		let mut domains: Vec<EnergyDomain> = Vec::new();

		for (zone, zone_dir) in scan_dirs(root, parse_zone_dir)? {
			let name = read_name(&zone_dir)?;
			let energy_path = require_energy_file(&zone_dir, &name)?;
			let kind = if name.starts_with(PACKAGE_MARKER) {
				DomainKind::Package
			} else {
				DomainKind::Other
			};
			let parent = DomainId(domains.len());
			domains.push(EnergyDomain {
				label: name.clone(),
				name,
				kind,
				parent: None,
				zone,
				subzone: None,
				max_energy_range_uj: read_max_range(&zone_dir),
				energy_path,
			});

			for ((_, subzone), sub_dir) in scan_dirs(&zone_dir, parse_subzone_dir)? {
				let name = read_name(&sub_dir)?;
				let energy_path = require_energy_file(&sub_dir, &name)?;
				let kind = if name.contains(MEMORY_MARKER) {
					DomainKind::Memory
				} else {
					DomainKind::Other
				};
				domains.push(EnergyDomain {
					label: name.clone(),
					name,
					kind,
					parent: Some(parent),
					zone,
					subzone: Some(subzone),
					max_energy_range_uj: read_max_range(&sub_dir),
					energy_path,
				});
			}
		}

		if domains.is_empty() {
			return Err(CollectorError::HardwareUnavailable {
				path: root.to_path_buf(),
				reason: "no intel-rapl zones found".into(),
			});
		}

		qualify_duplicate_labels(&mut domains);

		for domain in &domains {
			info!(
				domain = %domain.label,
				kind = ?domain.kind,
				path = %domain.energy_path.display(),
				"discovered energy counter"
			);
		}

		Ok(Self {
			root: root.to_path_buf(),
			domains,
		})
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn len(&self) -> usize {
		self.domains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.domains.is_empty()
	}

	pub fn domain(&self, id: DomainId) -> &EnergyDomain {
		&self.domains[id.0]
	}

	/// Iterates domains in handle order
	pub fn iter(&self) -> impl Iterator<Item = (DomainId, &EnergyDomain)> {
		self.domains.iter().enumerate().map(|(i, d)| (DomainId(i), d))
	}

	/// Finds a domain by its label
	pub fn find(&self, label: &str) -> Option<DomainId> {
		self.domains.iter().position(|d| d.label == label).map(DomainId)
	}

	pub fn packages(&self) -> impl Iterator<Item = DomainId> + '_ {
		self.of_kind(DomainKind::Package)
	}

	pub fn memory_domains(&self) -> impl Iterator<Item = DomainId> + '_ {
		self.of_kind(DomainKind::Memory)
	}

	/// Returns the distinguished memory subdomain of a package, if it has one
	pub fn memory_of(&self, package: DomainId) -> Option<DomainId> {
		self.iter()
			.find(|(_, d)| d.parent == Some(package) && d.kind == DomainKind::Memory)
			.map(|(id, _)| id)
	}

	fn of_kind(&self, kind: DomainKind) -> impl Iterator<Item = DomainId> + '_ {
		self.iter().filter(move |(_, d)| d.kind == kind).map(|(id, _)| id)
	}
}

/// Subzone names repeat across sockets (every package has a `dram`), so those get `parent/name`.
/// Siblings that share a name as well get their subzone number appended.
fn qualify_duplicate_labels(domains: &mut [EnergyDomain]) {
	let count = |pred: &dyn Fn(&EnergyDomain) -> bool| domains.iter().filter(|d| pred(d)).count();
	let labels: Vec<Option<String>> = domains
		.iter()
		.map(|d| {
			if count(&|other: &EnergyDomain| other.name == d.name) < 2 {
				return None;
			}
			let label = match (d.parent, d.subzone) {
				(Some(parent), Some(subzone)) => {
					let siblings = count(&|other: &EnergyDomain| other.parent == d.parent && other.name == d.name);
					let parent_name = &domains[parent.0].name;
					if siblings > 1 {
						format!("{parent_name}/{}:{subzone}", d.name)
					} else {
						format!("{parent_name}/{}", d.name)
					}
				},
				_ => format!("{}:{}", ZONE_PREFIX, d.zone),
			};
			Some(label)
		})
		.collect();

	for (domain, label) in domains.iter_mut().zip(labels) {
		if let Some(label) = label {
			domain.label = label;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::FakePowercap;

	#[test]
	fn zone_and_subzone_patterns() {
		assert_eq!(parse_zone_dir("intel-rapl:0"), Some(0));
		assert_eq!(parse_zone_dir("intel-rapl:12"), Some(12));
		assert_eq!(parse_zone_dir("intel-rapl:0:1"), None);
		assert_eq!(parse_zone_dir("intel-rapl"), None);
		assert_eq!(parse_zone_dir("intel-rapl:x"), None);

		assert_eq!(parse_subzone_dir("intel-rapl:0:1"), Some((0, 1)));
		assert_eq!(parse_subzone_dir("intel-rapl:0"), None);
		assert_eq!(parse_subzone_dir("intel-rapl:0:"), None);
		assert_eq!(parse_subzone_dir("amd-rapl:0:1"), None);
	}

	#[test]
	fn discovers_packages_and_memory_subzones() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 1_000);
		fake.subzone(0, 0, "core", 10);
		fake.subzone(0, 1, "dram", 20);

		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		assert_eq!(tree.len(), 3);

		let package = tree.find("package-0").unwrap();
		assert_eq!(tree.domain(package).kind, DomainKind::Package);
		assert_eq!(tree.packages().collect::<Vec<_>>(), vec![package]);

		let dram = tree.memory_of(package).unwrap();
		assert_eq!(tree.domain(dram).name, "dram");
		assert_eq!(tree.domain(dram).parent, Some(package));
		assert_eq!(tree.domain(tree.find("core").unwrap()).kind, DomainKind::Other);
	}

	#[test]
	fn duplicate_subzone_names_are_qualified() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 0);
		fake.subzone(0, 0, "dram", 0);
		fake.zone(1, "package-1", 0);
		fake.subzone(1, 0, "dram", 0);

		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		assert!(tree.find("dram").is_none());
		assert!(tree.find("package-0/dram").is_some());
		assert!(tree.find("package-1/dram").is_some());
		assert_eq!(tree.memory_domains().count(), 2);
	}

	#[test]
	fn same_named_siblings_get_their_subzone_number() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 0);
		fake.subzone(0, 0, "core", 0);
		fake.subzone(0, 1, "core", 0);
		fake.subzone(0, 2, "dram", 0);

		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		assert!(tree.find("package-0/core").is_none());
		assert_eq!(tree.find("package-0/core:0"), Some(DomainId(1)));
		assert_eq!(tree.find("package-0/core:1"), Some(DomainId(2)));
		assert_eq!(tree.find("dram"), Some(DomainId(3)));
	}

	#[test]
	fn zones_are_ordered_numerically() {
		let fake = FakePowercap::new();
		fake.zone(10, "psys", 0);
		fake.zone(2, "package-1", 0);
		fake.zone(0, "package-0", 0);
		fake.subzone(0, 10, "uncore", 0);
		fake.subzone(0, 2, "dram", 0);

		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		let order: Vec<(&str, u32, Option<u32>)> = tree
			.iter()
			.map(|(_, d)| (d.label.as_str(), d.zone, d.subzone))
			.collect();
		assert_eq!(
			order,
			vec![
				("package-0", 0, None),
				("dram", 0, Some(2)),
				("uncore", 0, Some(10)),
				("package-1", 2, None),
				("psys", 10, None),
			]
		);
		assert_eq!(tree.find("psys"), Some(DomainId(4)));
	}

	#[test]
	fn missing_energy_file_is_fatal() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 0);
		fake.subzone(0, 0, "dram", 0);
		fake.remove_counter(&[0, 0]);

		let err = EnergySourceTree::discover_at(fake.root()).unwrap_err();
		assert!(matches!(err, CollectorError::HardwareUnavailable { .. }), "{err}");
	}

	#[test]
	fn missing_name_file_is_fatal() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 0);
		fs::remove_file(fake.zone_dir(&[0]).join(NAME_FILE)).unwrap();

		let err = EnergySourceTree::discover_at(fake.root()).unwrap_err();
		assert!(matches!(err, CollectorError::HardwareUnavailable { .. }));
	}

	#[test]
	fn empty_or_missing_root_is_fatal() {
		let fake = FakePowercap::new();
		assert!(EnergySourceTree::discover_at(fake.root()).is_err());
		assert!(EnergySourceTree::discover_at(fake.root().join("nope")).is_err());
	}

	#[test]
	fn reads_counter_range_when_present() {
		let fake = FakePowercap::new();
		fake.zone(0, "package-0", 0);
		fs::write(fake.zone_dir(&[0]).join(MAX_ENERGY_RANGE_FILE), "262143328850\n").unwrap();

		let tree = EnergySourceTree::discover_at(fake.root()).unwrap();
		assert_eq!(tree.domain(DomainId(0)).max_energy_range_uj, Some(262_143_328_850));
	}
}
