//! Mapping from wiki page identifiers to files under the output root.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::FetchError;

pub const PAGE_EXTENSION: &str = "md";
#[cfg(unix)]
const DIR_MODE: u32 = 0o775;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WrittenPage {
    pub page: String,
    pub path: PathBuf,
    pub bytes: usize,
    pub content_hash: String,
    pub action: WriteAction,
}

/// Reject identifiers that are empty or could resolve outside the output root.
pub fn validate_page_identifier(page: &str) -> Result<(), FetchError> {
    let invalid = |reason| FetchError::InvalidIdentifier {
        page: page.to_string(),
        reason,
    };
    if page.trim().is_empty() {
        return Err(invalid("identifier is empty"));
    }
    if page.starts_with('/') || page.contains('\\') {
        return Err(invalid("identifier must be a relative `/`-separated path"));
    }
    if page.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(invalid("identifier contains a relative path segment"));
    }
    if page.ends_with('/') {
        return Err(invalid("identifier has no name segment"));
    }
    Ok(())
}

/// `rules/posting` under `out` becomes `out/rules/posting.md`; a single
/// segment lands directly in `out`. Empty segments are skipped.
pub fn page_destination(output_root: &Path, page: &str) -> PathBuf {
    let segments: Vec<&str> = page.split('/').filter(|s| !s.is_empty()).collect();
    let mut output = output_root.to_path_buf();
    if let Some((base_name, directories)) = segments.split_last() {
        for directory in directories {
            output.push(directory);
        }
        output.push(format!("{base_name}.{PAGE_EXTENSION}"));
    }
    output
}

/// Write `markdown` verbatim to the page's destination, creating missing
/// parent directories and overwriting any existing file. `page` must already
/// have passed [`validate_page_identifier`].
pub fn write_page(
    output_root: &Path,
    page: &str,
    markdown: &str,
) -> Result<WrittenPage, FetchError> {
    let path = page_destination(output_root, page);
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|source| FetchError::Filesystem {
            action: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content_hash = compute_hash(markdown.as_bytes());
    let action = match fs::read(&path) {
        Ok(existing) if compute_hash(&existing) == content_hash => WriteAction::Unchanged,
        Ok(_) => WriteAction::Updated,
        Err(_) => WriteAction::Created,
    };

    write_file(&path, markdown.as_bytes()).map_err(|source| FetchError::Filesystem {
        action: "write",
        path: path.clone(),
        source,
    })?;

    Ok(WrittenPage {
        page: page.to_string(),
        path,
        bytes: markdown.len(),
        content_hash,
        action,
    })
}

pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn create_dir_all(path: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.flush()
}
