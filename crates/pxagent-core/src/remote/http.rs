//! Plain HTTP GET returning the response body as text.

use std::time::Duration;

use super::FetchError;

/// Performs a GET with the given `Accept` header and returns the body.
///
/// Follows redirects. Any final status other than 200 is an error.
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn get_text(url: &str, accept: &str) -> Result<String, FetchError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(120))?;

    let mut list = curl::easy::List::new();
    list.append(&format!("Accept: {}", accept))?;
    easy.http_headers(list)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if status != 200 {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    String::from_utf8(body).map_err(|_| FetchError::Encoding(url.to_string()))
}
