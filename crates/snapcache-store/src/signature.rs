//! Source signature computation
//!
//! Dump sources are fingerprinted by content: a SHA-256 over the file bytes,
//! read in 1 MiB chunks so memory use does not depend on dump size. Live
//! sources are fingerprinted by connection descriptor only.

use crate::errors::{dump_unavailable, Result};
use crate::source::DataSource;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the signature identifying the source's current state
pub fn compute_signature(source: &DataSource) -> Result<String> {
    match source {
        DataSource::Dump(path) => dump_digest(path),
        DataSource::Live(settings) => Ok(settings.descriptor()),
    }
}

/// SHA-256 hex digest of a dump file
pub fn dump_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| dump_unavailable(path, &e))?;
    let mut hasher = Sha256::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut chunk).map_err(|e| dump_unavailable(path, &e))?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
