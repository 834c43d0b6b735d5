// Filesystem host binding — delivers saves as real files under a target directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use super::traits::{Blob, HostCaps, HostEnv};
use crate::config::DEFAULT_FILENAME;

/// Host environment backed by a local directory.
///
/// Object urls are entries in an in-memory registry; the direct save
/// primitive writes the blob under the requested filename. Navigation, the
/// last-resort delivery path, writes to a well-known name instead since a
/// plain url carries no filename.
pub struct FsHost {
    dir: PathBuf,
    caps: HostCaps,
    urls: RwLock<HashMap<String, Blob>>,
    next_url: AtomicU64,
}

impl FsHost {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_caps(
            dir,
            HostCaps {
                native_save: true,
                ..HostCaps::default()
            },
        )
    }

    /// Build a host advertising an explicit capability set. Used to exercise
    /// the non-native delivery branches against a real filesystem.
    pub fn with_caps(dir: impl Into<PathBuf>, caps: HostCaps) -> Self {
        Self {
            dir: dir.into(),
            caps,
            urls: RwLock::new(HashMap::new()),
            next_url: AtomicU64::new(0),
        }
    }

    /// Number of object urls currently registered.
    pub fn live_urls(&self) -> usize {
        self.urls.read().len()
    }

    fn write_blob(&self, blob: &Blob, filename: &str) -> Result<()> {
        // Keep only the final path component so a hostile filename cannot
        // escape the target directory.
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| anyhow!("invalid filename: {}", filename))?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, &blob.data)?;
        debug!("wrote {} bytes to {}", blob.len(), path.display());
        Ok(())
    }

    fn resolve_url(&self, url: &str) -> Result<Blob> {
        if let Some(blob) = self.urls.read().get(url) {
            return Ok(blob.clone());
        }
        if let Some(rest) = url.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| anyhow!("malformed data uri"))?;
            let data = if header.ends_with(";base64") {
                Bytes::from(BASE64.decode(payload)?)
            } else {
                Bytes::from(payload.as_bytes().to_vec())
            };
            let mime_type = header.trim_end_matches(";base64").to_string();
            return Ok(Blob { data, mime_type });
        }
        Err(anyhow!("unknown url: {}", url))
    }
}

#[async_trait]
impl HostEnv for FsHost {
    fn capabilities(&self) -> HostCaps {
        self.caps
    }

    fn create_object_url(&self, blob: &Blob) -> Result<String> {
        let id = self.next_url.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:savekit/{}", id);
        self.urls.write().insert(url.clone(), blob.clone());
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) -> Result<()> {
        self.urls.write().remove(url);
        debug!("revoked {}", url);
        Ok(())
    }

    fn save_blob(&self, blob: &Blob, filename: &str) -> Result<()> {
        self.write_blob(blob, filename)
    }

    fn click_download_link(&self, url: &str, filename: &str) -> Result<()> {
        let blob = self.resolve_url(url)?;
        self.write_blob(&blob, filename)
    }

    async fn read_as_data_uri(&self, blob: &Blob) -> Result<String> {
        Ok(format!(
            "data:{};base64,{}",
            blob.mime_type,
            BASE64.encode(&blob.data)
        ))
    }

    fn open_window(&self, _url: &str) -> Result<bool> {
        // No windowing on a plain filesystem host.
        Ok(false)
    }

    fn navigate(&self, url: &str) -> Result<()> {
        let blob = self.resolve_url(url)?;
        self.write_blob(&blob, DEFAULT_FILENAME)
    }

    fn confirm(&self, _message: &str) -> bool {
        true
    }
}
