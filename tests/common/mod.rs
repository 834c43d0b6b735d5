// Shared test fakes for the host environment.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use savekit::{Blob, HostCaps, HostEnv};

/// One observed call against the fake host, in invocation order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    CreateUrl(String),
    RevokeUrl(String),
    SaveBlob(String),
    ClickLink(String, String),
    ReadDataUri,
    OpenWindow(String),
    Navigate(String),
    Confirm,
}

/// Recording fake for [`HostEnv`]. Capability flags, popup behavior, and the
/// confirmation answer are all injectable.
pub struct MockHost {
    caps: HostCaps,
    popup_blocked: bool,
    confirm_answer: bool,
    calls: Mutex<Vec<HostCall>>,
    last_blob: Mutex<Option<Blob>>,
    on_read: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
    next_url: AtomicUsize,
}

impl MockHost {
    pub fn new(caps: HostCaps) -> Self {
        Self {
            caps,
            popup_blocked: false,
            confirm_answer: true,
            calls: Mutex::new(Vec::new()),
            last_blob: Mutex::new(None),
            on_read: Mutex::new(None),
            next_url: AtomicUsize::new(0),
        }
    }

    pub fn popup_blocked(mut self, blocked: bool) -> Self {
        self.popup_blocked = blocked;
        self
    }

    pub fn confirm_answer(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    /// Run `hook` from inside `read_as_data_uri`, before it returns. Lets a
    /// test abort a session while its async delivery is in flight.
    pub fn set_on_read(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_read.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// The blob most recently handed to the host.
    pub fn last_blob(&self) -> Option<Blob> {
        self.last_blob.lock().clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl HostEnv for MockHost {
    fn capabilities(&self) -> HostCaps {
        self.caps
    }

    fn create_object_url(&self, blob: &Blob) -> Result<String> {
        *self.last_blob.lock() = Some(blob.clone());
        let url = format!("blob:mock/{}", self.next_url.fetch_add(1, Ordering::Relaxed));
        self.record(HostCall::CreateUrl(url.clone()));
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) -> Result<()> {
        self.record(HostCall::RevokeUrl(url.to_string()));
        Ok(())
    }

    fn save_blob(&self, blob: &Blob, filename: &str) -> Result<()> {
        *self.last_blob.lock() = Some(blob.clone());
        self.record(HostCall::SaveBlob(filename.to_string()));
        Ok(())
    }

    fn click_download_link(&self, url: &str, filename: &str) -> Result<()> {
        self.record(HostCall::ClickLink(url.to_string(), filename.to_string()));
        Ok(())
    }

    async fn read_as_data_uri(&self, blob: &Blob) -> Result<String> {
        self.record(HostCall::ReadDataUri);
        if let Some(hook) = &*self.on_read.lock() {
            hook();
        }
        Ok(format!("data:{};base64,aGVsbG8=", blob.mime_type))
    }

    fn open_window(&self, url: &str) -> Result<bool> {
        self.record(HostCall::OpenWindow(url.to_string()));
        Ok(!self.popup_blocked)
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.record(HostCall::Navigate(url.to_string()));
        Ok(())
    }

    fn confirm(&self, _message: &str) -> bool {
        self.record(HostCall::Confirm);
        self.confirm_answer
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
