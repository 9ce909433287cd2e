//! Content checksum of a trace database
//!
//! The checksum depends only on the file bytes, so a snapshot stays valid
//! when the database is copied or renamed and goes stale as soon as its
//! content changes.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// SHA-256 of the file content, lowercase hex
pub fn file_checksum(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(READ_CHUNK, file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
