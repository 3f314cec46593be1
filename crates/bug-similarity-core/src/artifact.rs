//! Checksummed artifact files for built strategies.
//!
//! Layout:
//!
//! ```text
//! bugsim-artifact <version> <strategy-key> <sha256-hex>\n
//! <JSON payload>
//! ```
//!
//! [`read`] verifies every header field and the payload hash before
//! handing the payload back; nothing is decoded from a file that fails.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::{Result, SimilarityError};
use crate::similarity::StrategyKind;

/// File extension of saved strategies.
pub const EXTENSION: &str = "similaritymodel";

const MAGIC: &str = "bugsim-artifact";
const VERSION: u32 = 1;

/// Hex-encoded SHA-256 of `payload`.
pub fn checksum(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

/// Write header and payload to `path`, creating parent directories.
pub fn write(path: &Path, kind: StrategyKind, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let header = format!("{} {} {} {}\n", MAGIC, VERSION, kind.key(), checksum(payload));
    let mut bytes = Vec::with_capacity(header.len() + payload.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(payload);
    fs::write(path, bytes)?;
    Ok(())
}

/// Read and verify an artifact, returning its strategy kind and payload.
pub fn read(path: &Path) -> Result<(StrategyKind, Vec<u8>)> {
    let bytes = fs::read(path).map_err(|e| SimilarityError::Artifact(format!("{}: {}", path.display(), e)))?;
    let split = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| SimilarityError::Artifact("missing header".to_string()))?;
    let header = std::str::from_utf8(&bytes[..split])
        .map_err(|_| SimilarityError::Artifact("header is not UTF-8".to_string()))?;
    let payload = bytes[split + 1..].to_vec();

    let fields: Vec<&str> = header.split(' ').collect();
    let [magic, version, key, sum] = fields.as_slice() else {
        return Err(SimilarityError::Artifact(format!("malformed header: {:?}", header)));
    };
    if *magic != MAGIC {
        return Err(SimilarityError::Artifact(format!("not an artifact (magic {:?})", magic)));
    }
    if version.parse::<u32>().ok() != Some(VERSION) {
        return Err(SimilarityError::Artifact(format!("unsupported version {}", version)));
    }
    let kind: StrategyKind = key
        .parse()
        .map_err(|_| SimilarityError::Artifact(format!("unknown strategy {:?}", key)))?;
    if checksum(&payload) != *sum {
        return Err(SimilarityError::Artifact("checksum mismatch".to_string()));
    }
    Ok((kind, payload))
}
