use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// An in-memory payload tagged with its MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub data: Bytes,
    pub mime_type: String,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Host capabilities, probed once per environment.
///
/// The flags describe which delivery primitives exist and which browser
/// variant is running; they never change for the lifetime of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCaps {
    /// Direct "save this blob under a filename" primitive.
    pub native_save: bool,
    /// Download attribute on a link element plus a dispatchable click.
    pub anchor_download: bool,
    /// Mobile WebKit variant that only accepts raw data uris.
    pub constrained_webkit: bool,
    /// Desktop engine matching the data-uri reader capability signature.
    pub safari_like: bool,
    /// Asynchronous blob-to-data-uri reader.
    pub data_uri_reader: bool,
}

/// Host environment the engine delivers through.
///
/// Real bindings are supplied by the hosting platform; tests supply fakes.
/// Capability-gated methods are only invoked when the matching [`HostCaps`]
/// flag is set, so a binding without a primitive may simply return an error.
#[async_trait]
pub trait HostEnv: Send + Sync {
    fn capabilities(&self) -> HostCaps;

    /// Allocate a transient reference url for the blob.
    ///
    /// The engine owns release: it calls [`HostEnv::revoke_object_url`] after
    /// a grace delay once delivery has been handed off.
    fn create_object_url(&self, blob: &Blob) -> Result<String>;

    /// Release a previously allocated object url.
    fn revoke_object_url(&self, url: &str) -> Result<()>;

    /// Save the blob directly under `filename`.
    fn save_blob(&self, blob: &Blob, filename: &str) -> Result<()>;

    /// Point a download link at `url` with `filename` and synthesize a click.
    fn click_download_link(&self, url: &str, filename: &str) -> Result<()>;

    /// Read the blob into a data uri.
    async fn read_as_data_uri(&self, blob: &Blob) -> Result<String>;

    /// Open `url` in a new browsing context. Returns `false` when blocked.
    fn open_window(&self, url: &str) -> Result<bool>;

    /// Navigate the current browsing context to `url`.
    fn navigate(&self, url: &str) -> Result<()>;

    /// Ask the user to confirm falling back to in-context navigation.
    fn confirm(&self, message: &str) -> bool;
}
