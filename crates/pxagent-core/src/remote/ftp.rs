//! Anonymous FTP directory listing.

use std::time::Duration;

use super::parse::{parse_listing, ListingEntry};
use super::FetchError;

/// Lists the directory at `url` with a full `LIST` so entry sizes are known.
///
/// libcurl logs in as `anonymous` when the URL carries no credentials and
/// changes into the URL's directory before listing.
pub fn list_directory(url: &str) -> Result<Vec<ListingEntry>, FetchError> {
    let url = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    };
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&url)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(120))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let text = String::from_utf8(body).map_err(|_| FetchError::Encoding(url.clone()))?;
    Ok(parse_listing(&text))
}
