// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer and archive extraction.

use super::OciError;
use flate2::read::GzDecoder;
use std::path::Path;
use tar::Archive;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Unpack one artifact layer into `dst`.
///
/// Layers are tarballs, gzipped or plain; sniffed by magic since media
/// types don't survive to this point. `tar::Archive::unpack` refuses
/// entries that would escape `dst`.
pub(crate) fn unpack_layer(bytes: &[u8], dst: &Path) -> Result<(), OciError> {
    if bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC {
        unpack_tar(GzDecoder::new(bytes), dst)
    } else {
        unpack_tar(bytes, dst)
    }
}

fn unpack_tar<R: std::io::Read>(reader: R, dst: &Path) -> Result<(), OciError> {
    let mut archive = Archive::new(reader);
    archive.set_overwrite(true);
    archive.unpack(dst).map_err(|e| OciError::Malformed(format!("unpack: {e}")))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
