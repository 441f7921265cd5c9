//! ProteomeXchange dataset record (JSON from ProteomeCentral).
//!
//! Only the parts the agent needs are modeled; unknown fields are ignored.

use serde::Deserialize;

/// Name of the `fullDatasetLinks` term that carries the FTP base location.
pub const FTP_LOCATION_TERM: &str = "Dataset FTP location";
/// Name of the `datasetFiles` term for a raw file URI.
pub const RAW_FILE_TERM: &str = "Associated raw file URI";

/// A controlled-vocabulary term as it appears in the record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CvTerm {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    #[serde(default)]
    pub identifiers: Vec<CvTerm>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub full_dataset_links: Option<Vec<CvTerm>>,
    #[serde(default)]
    pub dataset_files: Option<Vec<CvTerm>>,
}

impl DatasetRecord {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// FTP base location of the dataset. Outer `None`: the record has no
    /// `fullDatasetLinks` at all; inner `None`: no FTP entry among them.
    pub fn ftp_location(&self) -> Option<Option<&str>> {
        self.full_dataset_links.as_ref().map(|links| {
            links
                .iter()
                .filter(|term| term.name == FTP_LOCATION_TERM)
                .filter_map(|term| term.value.as_deref())
                .map(|v| v.trim_end_matches('/'))
                .last()
        })
    }

    /// URIs of the raw files listed in `datasetFiles`, in record order.
    /// Empty when the record carries no structured file entries.
    pub fn raw_file_uris(&self) -> Vec<&str> {
        self.dataset_files
            .iter()
            .flatten()
            .filter(|term| term.name == RAW_FILE_TERM)
            .filter_map(|term| term.value.as_deref())
            .collect()
    }
}
