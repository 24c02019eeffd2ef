use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus {
	pub kind: &'static str,
	pub value: String,
}
impl fmt::Display for UnknownStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown {} status {:?}.", self.kind, self.value)
	}
}
impl std::error::Error for UnknownStatus {}

macro_rules! status_enum {
	(
		$(#[$meta:meta])*
		$name:ident, $label:literal {
			$($variant:ident => $text:literal),+ $(,)?
		}
	) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(rename_all = "snake_case")]
		pub enum $name {
			$($variant),+
		}
		impl $name {
			pub const ALL: &'static [Self] = &[$(Self::$variant),+];

			pub fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $text),+
				}
			}
		}
		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}
		impl FromStr for $name {
			type Err = UnknownStatus;

			fn from_str(value: &str) -> Result<Self, Self::Err> {
				match value {
					$($text => Ok(Self::$variant),)+
					_ => Err(UnknownStatus { kind: $label, value: value.to_string() }),
				}
			}
		}
	};
}

status_enum! {
	/// Jobs only move forward: queued, discovering, fetching, analyzing, then a terminal state.
	JobStatus, "job" {
		Queued => "queued",
		Discovering => "discovering",
		Fetching => "fetching",
		Analyzing => "analyzing",
		Complete => "complete",
		AnalysisFailed => "analysis_failed",
	}
}
impl JobStatus {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Complete | Self::AnalysisFailed)
	}

	/// Synthesis has been dispatched or the job is already finished.
	pub fn is_past_fan_in(self) -> bool {
		matches!(self, Self::Analyzing | Self::Complete | Self::AnalysisFailed)
	}
}

status_enum! {
	SourceStatus, "source" {
		Queued => "queued",
		Fetched => "fetched",
		FetchFailed => "fetch_failed",
		BlockedByRobots => "blocked_by_robots",
	}
}
impl SourceStatus {
	/// The fetch stage has finished with this source, whatever the outcome.
	pub fn is_settled(self) -> bool {
		!matches!(self, Self::Queued)
	}
}

status_enum! {
	DocumentStatus, "document" {
		Fetched => "fetched",
		Normalizing => "normalizing",
		Normalized => "normalized",
		NormalizeFailed => "normalize_failed",
		Indexed => "indexed",
		IndexFailed => "index_failed",
	}
}
impl DocumentStatus {
	pub const TERMINAL: [Self; 3] = [Self::Indexed, Self::IndexFailed, Self::NormalizeFailed];

	pub fn is_terminal(self) -> bool {
		Self::TERMINAL.contains(&self)
	}
}

status_enum! {
	SourceKind, "source kind" {
		Webpage => "webpage",
		Pdf => "pdf",
		Podcast => "podcast",
		Video => "video",
		Filing => "filing",
		Rss => "rss",
	}
}
