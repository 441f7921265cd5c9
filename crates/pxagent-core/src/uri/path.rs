//! Filename extraction from URL path.

use percent_encoding::percent_decode_str;

/// Extracts the last path segment from a URL for use as a filename,
/// percent-decoded so it names the file as it is stored locally.
///
/// Returns `None` if the URL cannot be parsed, the path is empty/root, or
/// the segment does not decode to UTF-8.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    if decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded.into_owned())
}

/// Appends `name` as a new path segment of `base`, percent-encoding it.
/// A trailing slash on `base` is tolerated.
pub fn join_url(base: &str, name: &str) -> Option<String> {
    let mut parsed = url::Url::parse(base).ok()?;
    {
        let mut segments = parsed.path_segments_mut().ok()?;
        segments.pop_if_empty().push(name);
    }
    Some(parsed.to_string())
}
