// src/store/publish.rs
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::IdentityIndex;

pub const VIDEO_EXT: &str = ".mp4";
/// First-time videos below this size are treated as aborted downloads.
pub const TRUNCATED_VIDEO_BYTES: u64 = 8 * 1024 * 1024;
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No file existed; the temp file was renamed into place.
    Promoted(PathBuf),
    /// A smaller file existed and was replaced.
    Replaced(PathBuf),
    /// An equal or larger file existed; the new payload was dropped.
    KeptExisting(PathBuf),
    /// A first-time video under the size floor was dropped.
    DiscardedTruncated(PathBuf),
}

impl PublishOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PublishOutcome::Promoted(p)
            | PublishOutcome::Replaced(p)
            | PublishOutcome::KeptExisting(p)
            | PublishOutcome::DiscardedTruncated(p) => p,
        }
    }

    /// True when the payload ended up under the final name.
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Promoted(_) | PublishOutcome::Replaced(_))
    }
}

type PathLocks = Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>;

/// Temp-write, mark, then promote with size-based conflict resolution.
///
/// Publishes to the same final path are serialized inside the process, so the
/// shared `.tmp` name is never written by two workers at once and the size
/// comparison always sees the other writer's result.
#[derive(Debug, Clone)]
pub struct Publisher {
    index: IdentityIndex,
    locks: PathLocks,
}

impl Publisher {
    pub fn new(index: IdentityIndex) -> Self {
        Self {
            index,
            locks: Arc::default(),
        }
    }

    fn lock_for(&self, final_path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        // drop entries nobody is holding or waiting on
        locks.retain(|_, l| Arc::strong_count(l) > 1);
        Arc::clone(locks.entry(final_path.to_path_buf()).or_default())
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    pub async fn publish(
        &self,
        bytes: &[u8],
        target_dir: &Path,
        name: &str,
        ext: &str,
        identity: &str,
    ) -> Result<PublishOutcome> {
        // 1) target dir
        fs::create_dir_all(target_dir)
            .await
            .with_context(|| format!("creating {}", target_dir.display()))?;

        // 2) full write to `<name><ext>.tmp`
        let tmp = target_dir.join(format!("{name}{ext}{TMP_SUFFIX}"));
        let path_lock = self.lock_for(&tmp);
        let _guard = path_lock.lock().await;
        if let Err(e) = write_fully(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        // 3) marker only after the temp write is durable on disk
        if let Err(e) = self.index.mark_done(identity).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        // 4) stat temp, derive final name
        let (tmp_len, final_path) = match temp_len_and_final(&tmp).await {
            Ok(v) => v,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        // 5) existing file: larger wins, ties keep the existing one
        match fs::metadata(&final_path).await {
            Ok(existing) => {
                if existing.len() < tmp_len {
                    promote(&tmp, &final_path).await?;
                    Ok(PublishOutcome::Replaced(final_path))
                } else {
                    discard(&tmp).await?;
                    Ok(PublishOutcome::KeptExisting(final_path))
                }
            }
            // 6) first publish under this name
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if ext.eq_ignore_ascii_case(VIDEO_EXT) && tmp_len < TRUNCATED_VIDEO_BYTES {
                    discard(&tmp).await?;
                    Ok(PublishOutcome::DiscardedTruncated(final_path))
                } else {
                    promote(&tmp, &final_path).await?;
                    Ok(PublishOutcome::Promoted(final_path))
                }
            }
            Err(e) => {
                Err(e).with_context(|| format!("stat {}", final_path.display()))
            }
        }
    }
}

async fn temp_len_and_final(tmp: &Path) -> Result<(u64, PathBuf)> {
    let len = fs::metadata(tmp)
        .await
        .with_context(|| format!("stat {}", tmp.display()))?
        .len();
    Ok((len, strip_tmp_suffix(tmp)?))
}

async fn write_fully(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = fs::File::create(path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    f.write_all(bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    f.flush().await?;
    f.sync_all().await?;

    let written = f.metadata().await?.len();
    if written != bytes.len() as u64 {
        return Err(anyhow!(
            "short write to {}: {written} of {} bytes",
            path.display(),
            bytes.len()
        ));
    }
    Ok(())
}

/// Exact suffix removal (a character-class trim would eat trailing `p`/`m`/`t`).
fn strip_tmp_suffix(tmp: &Path) -> Result<PathBuf> {
    let s = tmp
        .to_str()
        .ok_or_else(|| anyhow!("non UTF-8 temp path {}", tmp.display()))?;
    s.strip_suffix(TMP_SUFFIX)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("temp path without {TMP_SUFFIX} suffix: {s}"))
}

/// Rename replaces any existing file atomically, so the final name never goes missing.
async fn promote(tmp: &Path, final_path: &Path) -> Result<()> {
    fs::rename(tmp, final_path)
        .await
        .with_context(|| format!("renaming {} -> {}", tmp.display(), final_path.display()))
}

async fn discard(tmp: &Path) -> Result<()> {
    fs::remove_file(tmp)
        .await
        .with_context(|| format!("removing {}", tmp.display()))
}
