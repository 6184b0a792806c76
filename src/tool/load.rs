//! Dataset sources, upload validation, and request generations.

use url::Url;

use crate::error::DmsVizError;

/// Content type a local upload must declare.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Where the active dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DataSource {
    /// The bundled example.
    #[default]
    Example,
    /// A dataset URL (mirrored in the `data` parameter).
    Remote(String),
    /// A file uploaded from disk, by name.
    LocalFile(String),
}

/// Blocking text fetcher.
pub trait Fetcher {
    /// GET `url` and return the body.
    fn fetch_text(&self, url: &str) -> Result<String, DmsVizError>;
}

/// [`Fetcher`] over `ureq`.
#[cfg(feature = "fetch")]
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqFetcher;

#[cfg(feature = "fetch")]
impl Fetcher for UreqFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, DmsVizError> {
        let start = web_time::Instant::now();
        let body = ureq::get(url)
            .call()
            .map_err(|e| DmsVizError::Fetch(format!("{url}: {e}")))?
            .into_body()
            .read_to_string()
            .map_err(|e| DmsVizError::Fetch(format!("{url}: {e}")))?;
        log::debug!("fetched {} bytes from {url} in {:?}", body.len(), start.elapsed());
        Ok(body)
    }
}

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// File name.
    pub name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub contents: String,
}

impl LocalFile {
    /// Reject files that do not declare JSON content.
    pub fn validate(&self) -> Result<(), DmsVizError> {
        if self.content_type == JSON_CONTENT_TYPE {
            Ok(())
        } else {
            Err(DmsVizError::InvalidUpload(format!(
                "'{}' is {}, expected {JSON_CONTENT_TYPE}",
                self.name,
                if self.content_type.is_empty() {
                    "of unknown type"
                } else {
                    self.content_type.as_str()
                }
            )))
        }
    }
}

/// Check that a dataset URL is absolute.
pub fn validate_remote_url(raw: &str) -> Result<Url, DmsVizError> {
    Url::parse(raw.trim())
        .map_err(|e| DmsVizError::InvalidUpload(format!("'{raw}' is not a valid URL: {e}")))
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// Monotonic generation number.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Issues request tickets; only the latest one is current.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    /// Issue a ticket that supersedes every earlier one.
    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    /// Whether `ticket` is the most recently issued.
    #[must_use]
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_tickets_supersede_earlier_ones() {
        let mut tracker = RequestTracker::default();
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn uploads_must_be_json() {
        let mut file = LocalFile {
            name: "data.json".to_owned(),
            content_type: JSON_CONTENT_TYPE.to_owned(),
            contents: "{}".to_owned(),
        };
        assert!(file.validate().is_ok());
        file.content_type = "text/csv".to_owned();
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("text/csv"));
    }

    #[test]
    fn remote_urls_must_be_absolute() {
        assert!(validate_remote_url("https://example.org/data.json").is_ok());
        assert!(validate_remote_url("data.json").is_err());
        assert!(validate_remote_url("").is_err());
    }
}
