//! Parse FTP `LIST` output into names and sizes.

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    /// Size in bytes when the server reported one.
    pub size: Option<u64>,
    pub is_dir: bool,
}

/// Parse listing text. Understands Unix `ls -l` style lines
/// (`-rw-r--r-- 1 ftp ftp 1234 Jan 01 12:00 name`) and falls back to treating
/// the whole line as a bare name (`NLST` style).
pub fn parse_listing(text: &str) -> Vec<ListingEntry> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.starts_with("total "))
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<ListingEntry> {
    let first = line.chars().next()?;
    let looks_unix = matches!(first, '-' | 'd' | 'l') && line.split_whitespace().count() >= 9;
    if !looks_unix {
        let name = line.trim();
        return Some(ListingEntry {
            name: name.to_string(),
            size: None,
            is_dir: false,
        });
    }

    // Walk past the eight metadata columns; the rest of the line (which
    // may contain spaces) is the name.
    let mut rest = line;
    let mut fields = Vec::with_capacity(8);
    for _ in 0..8 {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = &rest[end..];
    }
    let mut name = rest.trim_start();
    if first == 'l' {
        if let Some((link, _target)) = name.split_once(" -> ") {
            name = link;
        }
    }
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(ListingEntry {
        name: name.to_string(),
        size: fields[4].parse().ok(),
        is_dir: first == 'd',
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_listing_with_sizes() {
        let text = "total 3\r\n\
            -rw-r--r--    1 ftp      ftp       1048576 Sep 10  2014 run_01.raw\r\n\
            -rw-r--r--    1 ftp      ftp          2048 Sep 10  2014 README.txt\r\n\
            drwxr-xr-x    2 ftp      ftp          4096 Sep 10  2014 generated\r\n";
        let entries = parse_listing(text);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "run_01.raw");
        assert_eq!(entries[0].size, Some(1_048_576));
        assert!(!entries[0].is_dir);
        assert!(entries[2].is_dir);
    }

    #[test]
    fn names_with_spaces_are_kept() {
        let text = "-rw-r--r-- 1 ftp ftp 10 Jan 01 12:00 my run 01.raw\n";
        let entries = parse_listing(text);
        assert_eq!(entries[0].name, "my run 01.raw");
        assert_eq!(entries[0].size, Some(10));
    }

    #[test]
    fn bare_names_have_no_size() {
        let entries = parse_listing("a.raw\nb.RAW\n\n");
        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    name: "a.raw".into(),
                    size: None,
                    is_dir: false
                },
                ListingEntry {
                    name: "b.RAW".into(),
                    size: None,
                    is_dir: false
                },
            ]
        );
    }
}
