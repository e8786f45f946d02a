use crate::error::InferenceError;
use crate::search::SearchPath;
use std::fs;
use std::path::{Path, PathBuf};

const RESOURCE: &str = "model artifact";

/// Files below this size are inspected for a storage-pointer stub.
pub const POINTER_STUB_MAX_BYTES: usize = 1024;

/// First line of a Git LFS pointer file.
pub const LFS_POINTER_SIGNATURE: &str = "version https://git-lfs.github.com/spec/v1";

/// First existing weights file among the candidates.
pub fn resolve_artifact_path(search: &SearchPath) -> Result<PathBuf, InferenceError> {
    let path = search
        .first_existing()
        .ok_or_else(|| InferenceError::missing(RESOURCE, search.candidates()))?;

    tracing::info!(path = %path.display(), "Found model artifact");

    Ok(path.to_path_buf())
}

/// Read the artifact in one pass and reject pointer stubs before anything
/// tries to deserialize it.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, InferenceError> {
    let bytes = fs::read(path).map_err(|e| InferenceError::malformed(RESOURCE, path, e))?;

    check_integrity(path, &bytes)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read model artifact");

    Ok(bytes)
}

/// Small files whose first line is the LFS pointer signature are stubs.
///
/// Small files that are not UTF-8 are taken to be real binary weights.
pub fn check_integrity(path: &Path, bytes: &[u8]) -> Result<(), InferenceError> {
    if bytes.len() >= POINTER_STUB_MAX_BYTES {
        return Ok(());
    }

    let Ok(text) = std::str::from_utf8(bytes) else {
        return Ok(());
    };

    let first_line = text.lines().next().unwrap_or_default().trim();

    if first_line == LFS_POINTER_SIGNATURE {
        return Err(InferenceError::CorruptArtifact {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            reason: "file is a Git LFS pointer, not the weights. Fetch the real file with \
                     `git lfs pull` during the build and check that Git LFS is enabled for \
                     the deployment"
                .to_string(),
        });
    }

    Ok(())
}
