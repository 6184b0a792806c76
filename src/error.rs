//! Crate-level error types.

use std::fmt;

/// Errors produced by the dms-viz crate.
#[derive(Debug)]
pub enum DmsVizError {
    /// Network or HTTP failure while fetching a dataset or document.
    Fetch(String),
    /// A dataset did not match the expected shape.
    SchemaValidation(String),
    /// A mutation record references a site missing from the sitemap.
    Mapping {
        /// Experiment being normalized.
        experiment: String,
        /// Reference site that has no sitemap entry.
        reference_site: String,
    },
    /// A URL query parameter could not be decoded.
    UrlParse {
        /// Query parameter name.
        param: String,
        /// Decoder message.
        message: String,
    },
    /// An option name or value was not recognized.
    InvalidOption {
        /// Option name.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// A user upload was rejected before parsing.
    InvalidUpload(String),
    /// The named experiment does not exist in the active dataset.
    UnknownExperiment(String),
    /// The named epitope does not exist in the active experiment.
    UnknownEpitope(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for DmsVizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            Self::SchemaValidation(msg) => {
                write!(f, "invalid dataset: {msg}")
            }
            Self::Mapping {
                experiment,
                reference_site,
            } => write!(
                f,
                "experiment '{experiment}': reference site \
                 '{reference_site}' is missing from the sitemap"
            ),
            Self::UrlParse { param, message } => {
                write!(f, "bad URL parameter '{param}': {message}")
            }
            Self::InvalidOption { key, value } => {
                write!(f, "invalid value '{value}' for option '{key}'")
            }
            Self::InvalidUpload(msg) => write!(f, "upload rejected: {msg}"),
            Self::UnknownExperiment(name) => {
                write!(f, "unknown experiment '{name}'")
            }
            Self::UnknownEpitope(name) => {
                write!(f, "unknown epitope '{name}'")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for DmsVizError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DmsVizError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for DmsVizError {
    fn from(e: serde_json::Error) -> Self {
        Self::SchemaValidation(e.to_string())
    }
}
