//! Capability-aware file save engine.
//!
//! A [`Saver`] binds a filename and options to a host environment, resolving
//! the MIME type eagerly and probing the host's delivery capabilities once.
//! Each call to [`Saver::session`] produces a single-use [`SaveSession`]
//! that drives one save attempt through a fixed lifecycle of phases,
//! delegating the actual byte hand-off to the first matching delivery
//! strategy (native save, download-attribute click, async data-uri read, or
//! plain navigation).
//!
//! ```no_run
//! # async fn demo() -> Result<(), savekit::SaveError> {
//! use std::sync::Arc;
//! use savekit::{host::fs_host::FsHost, SaveOptions};
//!
//! let env = Arc::new(FsHost::new("/tmp/downloads"));
//! let handle = savekit::save(env, "hello", "greeting.txt", SaveOptions::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod mime;

use std::sync::Arc;

use bytes::Bytes;

use crate::config::{SaverConfig, DEFAULT_FILENAME, DEFAULT_MIME_TYPE};
use crate::engine::dispatch::DeliveryPlan;
use crate::engine::options::SaveHooks;

pub use crate::engine::options::SaveOptions;
pub use crate::engine::session::SaveSession;
pub use crate::engine::status::{Phase, SaveStatus};
pub use crate::error::SaveError;
pub use crate::host::traits::{Blob, HostCaps, HostEnv};

/// Factory for save sessions sharing one filename, option set, and host.
///
/// The MIME type is resolved once at construction and is immutable after
/// that; sessions produced by the factory inherit it together with the
/// probed delivery plan and the lifecycle hooks.
pub struct Saver {
    env: Arc<dyn HostEnv>,
    plan: Arc<DeliveryPlan>,
    hooks: Arc<SaveHooks>,
    filename: String,
    mime_type: String,
    auto_bom: bool,
    config: SaverConfig,
}

impl Saver {
    /// Bind `filename` and `options` to a host environment. An empty
    /// filename falls back to [`DEFAULT_FILENAME`].
    pub fn new(env: Arc<dyn HostEnv>, filename: impl Into<String>, options: SaveOptions) -> Self {
        Self::with_config(env, filename, options, SaverConfig::default())
    }

    pub fn with_config(
        env: Arc<dyn HostEnv>,
        filename: impl Into<String>,
        options: SaveOptions,
        config: SaverConfig,
    ) -> Self {
        let mut filename = filename.into();
        if filename.is_empty() {
            filename = DEFAULT_FILENAME.to_string();
        }
        let mime_type = mime::resolve(options.mime_type.as_deref(), &filename);
        let plan = Arc::new(DeliveryPlan::probe(env.as_ref()));

        Self {
            env,
            plan,
            hooks: Arc::new(options.hooks),
            filename,
            mime_type,
            auto_bom: options.auto_bom,
            config,
        }
    }

    /// The resolved MIME type sessions will carry.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Produce a fresh single-use session owning `data`.
    pub fn session(&self, data: impl Into<Bytes>) -> SaveSession {
        // Payloads that resolved to the generic binary type prefer in-page
        // navigation over a new browsing context on the fallback paths.
        let force_load = self.mime_type == DEFAULT_MIME_TYPE;
        SaveSession::new(
            Arc::clone(&self.env),
            Arc::clone(&self.plan),
            Arc::clone(&self.hooks),
            data.into(),
            self.filename.clone(),
            self.mime_type.clone(),
            self.auto_bom,
            force_load,
            self.config.revoke_grace(),
        )
    }
}

/// One-shot convenience: build a [`Saver`] and run a single session to
/// completion, resolving with the delivered handle.
pub async fn save(
    env: Arc<dyn HostEnv>,
    data: impl Into<Bytes>,
    filename: &str,
    options: SaveOptions,
) -> Result<String, SaveError> {
    Saver::new(env, filename, options).session(data).save().await
}
