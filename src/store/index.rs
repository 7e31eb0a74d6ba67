// src/store/index.rs
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// Hex SHA-256 of an identity. Used both for marker paths and derived file names.
pub fn identity_hash(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Zero-byte markers at `<lib>/<h[0]>/<h[1]>/<hash>`; a marker exists iff the
/// identity was published.
#[derive(Debug, Clone)]
pub struct IdentityIndex {
    root: PathBuf,
}

impl IdentityIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn marker_path(&self, identity: &str) -> PathBuf {
        let h = identity_hash(identity);
        self.root.join(&h[0..1]).join(&h[1..2]).join(&h)
    }

    pub async fn exists(&self, identity: &str) -> Result<bool> {
        let p = self.marker_path(identity);
        match fs::metadata(&p).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("probing marker {}", p.display())),
        }
    }

    /// Idempotent: an existing marker is not an error.
    pub async fn mark_done(&self, identity: &str) -> Result<()> {
        let p = self.marker_path(identity);
        if let Some(dir) = p.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating marker dir {}", dir.display()))?;
        }
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&p)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e).with_context(|| format!("creating marker {}", p.display())),
        }
    }
}
