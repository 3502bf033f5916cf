// Linux powercap layout
pub const POWERCAP_ROOT: &str = "/sys/class/powercap/intel-rapl";
pub const PROC_ROOT: &str = "/proc";
pub const ZONE_PREFIX: &str = "intel-rapl";
pub const NAME_FILE: &str = "name";
pub const ENERGY_FILE: &str = "energy_uj";
pub const MAX_ENERGY_RANGE_FILE: &str = "max_energy_range_uj";

// Domain classification markers
pub const PACKAGE_MARKER: &str = "package";
pub const MEMORY_MARKER: &str = "dram";

// Sampling settings
pub const DEFAULT_INTERVAL_MS: u64 = 2_000;
/// Minimum time the RAPL registers need after a read before they reflect new energy.
pub const SETTLE_THRESHOLD_US: u64 = 1_600;
pub const DEFAULT_IDLE_SECS: u64 = 16;

// Unit conversions
pub const MICROJOULES_PER_JOULE: f64 = 1_000_000.0;
pub const JOULES_PER_KWH: f64 = 3_600_000.0;
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
pub const DISK_SECTOR_BYTES: u64 = 512;

// Environment configuration keys
pub const ENV_INTERVAL_MS: &str = "DB_ENERGY_INTERVAL_MS";
pub const ENV_SETTLE_US: &str = "DB_ENERGY_SETTLE_US";
pub const ENV_POWERCAP_ROOT: &str = "DB_ENERGY_POWERCAP_ROOT";
pub const ENV_PROC_ROOT: &str = "DB_ENERGY_PROC_ROOT";
pub const ENV_CARBON_INTENSITY: &str = "DB_ENERGY_CARBON_INTENSITY";
pub const ENV_IDLE_SECS: &str = "DB_ENERGY_IDLE_SECS";
