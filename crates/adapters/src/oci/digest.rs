// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content digests of scenario directories.

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Digest a directory tree: every file's relative path and bytes, walked in
/// sorted order so the digest is stable across platforms and runs.
///
/// Used as the challenge `hash` and as the cache key for dir-referenced
/// scenarios.
pub fn dir_digest(dir: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hash_dir(&mut hasher, dir, Path::new(""))?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn hash_dir(hasher: &mut Sha256, dir: &Path, rel: &Path) -> io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let file_type = entry.file_type()?;
        let rel_path = rel.join(entry.file_name());
        if file_type.is_dir() {
            hash_dir(hasher, &entry.path(), &rel_path)?;
        } else if file_type.is_file() {
            hasher.update(rel_path.to_string_lossy().as_bytes());
            hasher.update([0]);
            let bytes = std::fs::read(entry.path())?;
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(&bytes);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
