//! Error types shared across the tracker.

// ── Criterion errors ───────────────────────────────────────────────────────

/// Reasons a criterion cannot produce a value for a segment pair.
///
/// Either case makes the pair incompatible; neither aborts the pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionError {
    /// Segments do not carry the number of hits the criterion works on.
    BadSegmentLength {
        /// Hits per segment the criterion expects.
        expected: usize,
        /// Hits per segment actually provided (parent, child).
        got: (usize, usize),
    },
    /// Geometry is degenerate for this criterion (zero Δz, collinear points).
    Degenerate(&'static str),
}

impl std::fmt::Display for CriterionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadSegmentLength { expected, got } => write!(
                f,
                "bad segment length: expected {} hit(s) per segment, got ({}, {})",
                expected, got.0, got.1
            ),
            Self::Degenerate(what) => write!(f, "degenerate geometry: {}", what),
        }
    }
}

impl std::error::Error for CriterionError {}

// ── Configuration errors ───────────────────────────────────────────────────

/// Invalid configuration values detected by [`crate::TrackerConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A criterion acceptance window has `min > max` or non-finite bounds.
    InvalidWindow {
        /// Criterion name as written in the configuration.
        name: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// A numeric parameter is outside its allowed range.
    OutOfRange {
        /// Dotted path of the offending field.
        field: String,
        /// Offending value.
        value: f64,
    },
    /// Schema tag of a JSON document is not supported.
    UnsupportedSchema {
        /// Schema string found in the document.
        found: String,
        /// Schema string this build understands.
        expected: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWindow { name, min, max } => {
                write!(f, "criterion '{}' has invalid window [{}, {}]", name, min, max)
            }
            Self::OutOfRange { field, value } => {
                write!(f, "configuration value {} = {} is out of range", field, value)
            }
            Self::UnsupportedSchema { found, expected } => {
                write!(f, "unsupported schema '{}' (expected '{}')", found, expected)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Tracker errors ─────────────────────────────────────────────────────────

/// Errors surfaced by hit sources and configuration loading.
#[derive(Debug)]
pub enum TrackerError {
    /// Reading an input file failed.
    Io(std::io::Error),
    /// An input document is not valid JSON for the expected schema.
    Json(serde_json::Error),
    /// Configuration failed validation.
    Config(ConfigError),
    /// The requested event is not present in the source.
    UnknownEvent(u64),
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Json(e) => write!(f, "json error: {}", e),
            Self::Config(e) => write!(f, "config error: {}", e),
            Self::UnknownEvent(id) => write!(f, "event {} not found in source", id),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::UnknownEvent(_) => None,
        }
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ConfigError> for TrackerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
