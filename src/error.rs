use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the telemetry collector
///
/// None of these are retried. Discovery failures abort the benchmark before any
/// session starts; counter and probe failures abort the session they occur in.
#[derive(Debug, Error)]
pub enum CollectorError {
	/// A counter the collector needs is not exposed by the platform
	#[error("energy counters unavailable at {}: {reason}", .path.display())]
	HardwareUnavailable { path: PathBuf, reason: String },

	/// A counter that was discovered could not be read during a session
	#[error(
		"failed to read energy counter for domain `{domain}` at {}{}{}: {source}",
		.path.display(),
		.session.as_deref().map(|s| format!(" (session `{s}`)")).unwrap_or_default(),
		.hint.map(|h| format!(" [{h}]")).unwrap_or_default()
	)]
	CounterReadFailure {
		session: Option<String>,
		domain: String,
		path: PathBuf,
		hint: Option<&'static str>,
		#[source]
		source: io::Error,
	},

	/// `start`/`stop` called out of order
	#[error("cannot {operation} a sampler that is {state}")]
	InvalidStateTransition { operation: &'static str, state: &'static str },

	/// Memory or CPU sampling from procfs failed during a session
	#[error(
		"resource sampling failed{}: {source}",
		.session.as_deref().map(|s| format!(" (session `{s}`)")).unwrap_or_default()
	)]
	ResourceProbe {
		session: Option<String>,
		#[source]
		source: io::Error,
	},

	#[error("carbon intensity source `{source_name}` returned an unusable value: {value}")]
	InvalidCarbonIntensity { source_name: String, value: String },

	#[error("invalid configuration {key}={value}: {reason}")]
	Config { key: &'static str, value: String, reason: String },
}

impl CollectorError {
	/// Tags session-scoped failures with the session they aborted
	pub fn in_session(mut self, label: &str) -> Self {
		match &mut self {
			CollectorError::CounterReadFailure { session, .. } | CollectorError::ResourceProbe { session, .. } => {
				*session = Some(label.to_string());
			},
			_ => {},
		}
		self
	}
}

pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn session_label_is_attached_to_counter_failures() {
		let err = CollectorError::CounterReadFailure {
			session: None,
			domain: "package-0".into(),
			path: PathBuf::from("/x/energy_uj"),
			hint: None,
			source: io::Error::new(io::ErrorKind::NotFound, "gone"),
		}
		.in_session("Q6");

		let msg = err.to_string();
		assert!(msg.contains("package-0"));
		assert!(msg.contains("session `Q6`"));
	}

	#[test]
	fn session_label_leaves_other_errors_alone() {
		let err = CollectorError::InvalidStateTransition {
			operation: "stop",
			state: "idle",
		}
		.in_session("load");
		assert_eq!(err.to_string(), "cannot stop a sampler that is idle");
	}
}
