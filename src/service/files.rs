use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use regex::Regex;

/// Capture files in `dir` matching `pattern`, oldest name first. The newest
/// match is still being written and is left out.
pub fn ready(dir: &Path, pattern: &Regex) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        if name.to_str().map_or(false, |name| pattern.is_match(name)) {
            files.push(entry.path());
        }
    }

    files.sort();
    files.pop();

    Ok(files)
}
