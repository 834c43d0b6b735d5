use std::time::Duration;

use serde::Deserialize;

/// MIME type used when resolution finds nothing better.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Filename used when the caller supplies an empty one.
pub const DEFAULT_FILENAME: &str = "download.txt";

/// Grace period before a delivered object url is revoked (30 s).
///
/// The host may still be streaming the payload out of the url when the
/// save call returns, so release is deferred rather than immediate.
pub const REVOKE_GRACE_MILLIS: u64 = 30_000;

/// UTF-8 byte-order mark prepended to BOM-eligible payloads.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Prompt shown before falling back to in-context navigation when a new
/// browsing context is blocked.
pub const CONFIRMATION_MESSAGE: &str = "Displaying new document\n\n\
Use Save As... to download, then click back in your browser to return to this page.";

/// Top-level configuration for the save engine.
#[derive(Debug, Clone, Deserialize)]
pub struct SaverConfig {
    /// Milliseconds to wait before revoking a delivered object url.
    pub revoke_grace_ms: u64,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            revoke_grace_ms: REVOKE_GRACE_MILLIS,
        }
    }
}

impl SaverConfig {
    pub fn revoke_grace(&self) -> Duration {
        Duration::from_millis(self.revoke_grace_ms)
    }
}
