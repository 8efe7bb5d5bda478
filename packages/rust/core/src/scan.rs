//! Company names mined from a directory of text files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use companyintel_extract::extract_company_names;
use companyintel_shared::{CompanyIntelError, Result, normalize_name};
use tracing::{debug, info, warn};

/// Names found in every `*.txt` file directly under `dir`.
///
/// Files are read in path order; names are de-duplicated across files,
/// keeping the first spelling seen. Unreadable files are logged and skipped.
pub fn scan_directory(dir: &Path) -> Result<Vec<String>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| CompanyIntelError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .collect();
    files.sort();

    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        let found = extract_company_names(&text);
        debug!(file = %file.display(), names = found.len(), "file scanned");
        for name in found {
            if seen.insert(normalize_name(&name)) {
                names.push(name);
            }
        }
    }

    info!(dir = %dir.display(), files = files.len(), names = names.len(), "directory scanned");
    Ok(names)
}
