//! `nullfilter` diagnostic filter file.

use std::fs;
use std::io;
use std::path::Path;

/// File beside the project listing filter names.
pub const FILTER_FILE_NAME: &str = "nullfilter";

/// One filter per line; `#` starts a comment, blank lines are ignored.
pub fn parse_filters(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| match line.find('#') {
            Some(at) => &line[..at],
            None => line,
        })
        .map(str::trim)
        .filter(|filter| !filter.is_empty())
        .map(String::from)
        .collect()
}

/// Filters from `dir/nullfilter`, empty when the file does not exist.
pub fn read_filters(dir: &Path) -> io::Result<Vec<String>> {
    let path = dir.join(FILTER_FILE_NAME);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    Ok(parse_filters(&fs::read_to_string(path)?))
}
