use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::RunError;
use crate::report::model::{ArtifactHash, ArtifactInfo};

/// An application binary loaded for upload.
///
/// Holds the exact bytes that will be sent and a fingerprint that
/// identifies them in the run report.
#[derive(Debug, Clone)]
pub struct BinaryArtifact {
    /// Source path (informational only).
    pub path: String,

    /// Exact bytes read from disk.
    pub bytes: Vec<u8>,

    /// Hex-encoded SHA-256 of `bytes`.
    pub sha256: String,
}

impl BinaryArtifact {
    /// Report-facing metadata. Raw bytes are not carried over.
    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            path: Some(self.path.clone()),
            size_bytes: self.bytes.len() as u64,
            hash: ArtifactHash {
                algorithm: "sha256".to_string(),
                value: self.sha256.clone(),
            },
        }
    }

    /// Hand the bytes over to the uploader.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read an application binary and fingerprint it.
///
/// The fingerprint depends only on the file bytes, never on filesystem
/// metadata.
pub async fn read_binary(path: &Path) -> Result<BinaryArtifact, RunError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let digest = Sha256::digest(&bytes);

    Ok(BinaryArtifact {
        path: path.display().to_string(),
        bytes,
        sha256: hex::encode(digest),
    })
}
