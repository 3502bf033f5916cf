//! Energy, carbon and resource telemetry for database benchmark sessions.
//!
//! A driver discovers the machine's energy counters once, then brackets each query,
//! load or idle phase with a [`PeriodicSampler`] and turns the result into a
//! [`RunStats`] record with [`aggregate`].

pub mod accumulator;
pub mod carbon;
pub mod config;
pub mod constants;
pub mod display;
pub mod domain;
pub mod energy;
pub mod error;
pub mod resources;
pub mod sampler;
pub mod session;
pub mod stats;
pub mod util;

#[cfg(test)]
pub(crate) mod testutil;

pub use accumulator::{ResourceSeries, RunAccumulator, RunResults};
pub use carbon::{CarbonIntensity, CarbonIntensitySource, EnvIntensity, FixedIntensity, refresh};
pub use config::SamplerConfig;
pub use domain::{DomainId, DomainKind, EnergyDomain, EnergySourceTree};
pub use energy::{EnergySnapshot, MeasurementWindow};
pub use error::{CollectorError, Result};
pub use resources::{ProcResourceProbe, ResourceProbe, ResourceSample};
pub use sampler::{PeriodicSampler, SamplerState, settle_delay};
pub use session::{Measured, measure, measure_idle};
pub use stats::{DomainStats, RunStats, aggregate};
pub use util::disk::{IoCounters, filter_non_zero, io_delta, read_disk_counters};
