//! Remote catalog access: dataset metadata records over HTTP and directory
//! listings over anonymous FTP.
//!
//! Uses the curl crate (libcurl) for both. The dataset state machine talks to
//! a [`RemoteCatalog`] so tests can substitute canned records and listings.

mod ftp;
mod http;
mod parse;

use thiserror::Error;

pub use ftp::list_directory;
pub use http::get_text;
pub use parse::{parse_listing, ListingEntry};

/// Record lookup endpoint; `{}` is replaced by the dataset id.
pub const DEFAULT_RECORD_ENDPOINT: &str =
    "http://proteomecentral.proteomexchange.org/cgi/GetDataset?ID={}&outputMode=json";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transfer failed: {0}")]
    Curl(#[from] curl::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u32 },
    #[error("response from {0} is not valid UTF-8")]
    Encoding(String),
}

/// Source of dataset records and remote directory listings.
pub trait RemoteCatalog: Send {
    /// Fetch the raw metadata record (JSON text) for `dataset_id`.
    fn fetch_record(&self, dataset_id: &str) -> Result<String, FetchError>;

    /// List the entries of the remote directory at `url`.
    fn list_directory(&self, url: &str) -> Result<Vec<ListingEntry>, FetchError>;
}

/// Production catalog backed by libcurl.
#[derive(Debug, Clone)]
pub struct CurlCatalog {
    record_endpoint: String,
}

impl Default for CurlCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_ENDPOINT)
    }
}

impl CurlCatalog {
    /// `record_endpoint` must contain `{}` where the dataset id goes.
    pub fn new(record_endpoint: impl Into<String>) -> Self {
        Self {
            record_endpoint: record_endpoint.into(),
        }
    }

    pub fn record_url(&self, dataset_id: &str) -> String {
        self.record_endpoint.replace("{}", dataset_id)
    }
}

impl RemoteCatalog for CurlCatalog {
    fn fetch_record(&self, dataset_id: &str) -> Result<String, FetchError> {
        let url = self.record_url(dataset_id);
        tracing::debug!(%url, "fetching dataset record");
        get_text(&url, "application/json")
    }

    fn list_directory(&self, url: &str) -> Result<Vec<ListingEntry>, FetchError> {
        tracing::debug!(%url, "listing remote directory");
        list_directory(url)
    }
}
