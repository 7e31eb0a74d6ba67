// src/embed/mod.rs
//! Provenance stamping: file kind sniffing and the comment embedders for
//! JPEG (Exif `UserComment`) and PNG (`iTXt` `Comment`).

mod jpeg;
mod png;

use anyhow::Result;

pub const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Origin marker written next to the comment (Exif `Make`, PNG `Source`).
pub const ORIGIN_MARKER: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Png,
    Jpeg,
    Other,
}

impl FileKind {
    /// Prefix sniff, not a validating parse.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&PNG_MAGIC) {
            FileKind::Png
        } else if bytes.starts_with(&JPEG_SOI) {
            FileKind::Jpeg
        } else {
            FileKind::Other
        }
    }

    /// Anything that is not PNG is stored as `.jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Png => ".png",
            FileKind::Jpeg | FileKind::Other => ".jpg",
        }
    }
}

pub trait CommentEmbedder: Send + Sync {
    fn embed(&self, kind: FileKind, bytes: Vec<u8>, comment: &str) -> Result<Vec<u8>>;
}

/// Default embedder; leaves non-image payloads untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProvenanceEmbedder;

impl CommentEmbedder for ProvenanceEmbedder {
    fn embed(&self, kind: FileKind, bytes: Vec<u8>, comment: &str) -> Result<Vec<u8>> {
        match kind {
            FileKind::Jpeg => jpeg::embed_user_comment(&bytes, comment),
            FileKind::Png => png::embed_comment(&bytes, comment),
            FileKind::Other => Ok(bytes),
        }
    }
}
