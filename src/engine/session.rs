// Save session state machine — drives a single save attempt through its lifecycle phases.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::dispatch::{DeliveryPlan, DeliveryRequest};
use crate::engine::options::SaveHooks;
use crate::engine::status::{self, Phase, SaveStatus};
use crate::error::SaveError;
use crate::host::traits::{Blob, HostEnv};
use crate::mime;

/// One save attempt. Single-use: after reaching a terminal status every
/// further `save()` or `abort()` rejects.
///
/// The session owns the payload and mutates only its own `status`, `error`
/// and `size`; external code drives it exclusively through [`Self::save`]
/// and [`Self::abort`].
pub struct SaveSession {
    env: Arc<dyn HostEnv>,
    plan: Arc<DeliveryPlan>,
    hooks: Arc<SaveHooks>,
    data: Bytes,
    filename: String,
    mime_type: String,
    auto_bom: bool,
    force_load: bool,
    revoke_grace: Duration,
    status: Mutex<SaveStatus>,
    error: Mutex<Option<SaveError>>,
    size: AtomicU64,
}

impl std::fmt::Debug for SaveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveSession")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("auto_bom", &self.auto_bom)
            .field("force_load", &self.force_load)
            .field("revoke_grace", &self.revoke_grace)
            .field("status", &*self.status.lock())
            .field("size", &self.size.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SaveSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        env: Arc<dyn HostEnv>,
        plan: Arc<DeliveryPlan>,
        hooks: Arc<SaveHooks>,
        data: Bytes,
        filename: String,
        mime_type: String,
        auto_bom: bool,
        force_load: bool,
        revoke_grace: Duration,
    ) -> Self {
        Self {
            env,
            plan,
            hooks,
            data,
            filename,
            mime_type,
            auto_bom,
            force_load,
            revoke_grace,
            status: Mutex::new(SaveStatus::Pending),
            error: Mutex::new(None),
            size: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.lock()
    }

    /// The recorded failure, populated once the session is cancelled or errored.
    pub fn error(&self) -> Option<SaveError> {
        self.error.lock().clone()
    }

    /// Byte length of the constructed payload, excluding any prepended BOM.
    /// Meaningful once output creation has succeeded.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Run the save pipeline to completion.
    ///
    /// Resolves with the delivered handle, or rejects after routing the
    /// failure through the error phase (`on_error` always fires, the
    /// recorded error never gets swallowed). A second call rejects without
    /// re-executing any phase.
    pub async fn save(&self) -> Result<String, SaveError> {
        match self.run_phases().await {
            Ok(handle) => Ok(handle),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Cancel the session while it is still cancellable.
    ///
    /// Valid from `Pending` or `Processing`; an in-flight `save()` halts at
    /// its next phase boundary. On a terminal session this records an
    /// already-finished error and rejects, leaving the status unchanged.
    pub fn abort(&self) -> Result<&Self, SaveError> {
        {
            let mut current = self.status.lock();
            match status::cancel(*current) {
                Some(next) => *current = next,
                None => {
                    drop(current);
                    let error = SaveError::AlreadyFinished(self.filename.clone());
                    *self.error.lock() = Some(error.clone());
                    return Err(error);
                }
            }
        }

        debug!("save of {} aborted", self.filename);
        *self.error.lock() = Some(SaveError::Aborted(self.filename.clone()));
        if let Some(hook) = &self.hooks.on_abort {
            hook(self);
        }
        Ok(self)
    }

    async fn run_phases(&self) -> Result<String, SaveError> {
        // Before-save: the payload is shown to the caller untouched.
        self.enter_phase(Phase::BeforeSave)?;
        if let Some(hook) = &self.hooks.on_before_save {
            hook(&self.data);
        }

        // Start-save: the session becomes processing.
        self.enter_phase(Phase::StartSave)?;
        if let Some(hook) = &self.hooks.on_start_save {
            hook(self);
        }

        // Create-output: build the blob, apply the BOM transform, allocate
        // the transient reference handle.
        self.enter_phase(Phase::CreateOutput)?;
        let blob = self.create_blob();
        let object_url = self.env.create_object_url(&blob)?;
        self.size.store(self.data.len() as u64, Ordering::Relaxed);
        debug!(
            "created output for {} ({} bytes, {})",
            self.filename,
            blob.len(),
            self.mime_type
        );

        // Deliver-output: exactly one capability branch runs.
        self.enter_phase(Phase::DeliverOutput)?;
        let cancelled = || self.status() == SaveStatus::Cancelled;
        let delivered = self
            .plan
            .dispatch(
                self.env.as_ref(),
                DeliveryRequest {
                    blob: &blob,
                    object_url: &object_url,
                    filename: &self.filename,
                    force_load: self.force_load,
                    caps: *self.plan.caps(),
                    cancelled: &cancelled,
                },
            )
            .await?;

        // End-save: the handle is released after a grace delay so the host
        // can finish consuming it.
        self.enter_phase(Phase::EndSave)?;
        self.schedule_revoke(object_url);
        if let Some(hook) = &self.hooks.on_end_save {
            hook(self);
        }

        // After-save.
        self.enter_phase(Phase::AfterSave)?;
        if let Some(hook) = &self.hooks.on_after_save {
            hook(self);
        }

        Ok(delivered)
    }

    /// Assert the phase's pre-state and apply its transition.
    ///
    /// When the session was cancelled between phases the stored abort error
    /// is surfaced instead of a phase-order failure.
    fn enter_phase(&self, phase: Phase) -> Result<(), SaveError> {
        let mut current = self.status.lock();
        match status::enter(phase, *current) {
            Ok(next) => {
                *current = next;
                Ok(())
            }
            Err(_) if *current == SaveStatus::Cancelled => {
                drop(current);
                Err(self
                    .error
                    .lock()
                    .clone()
                    .unwrap_or_else(|| SaveError::Aborted(self.filename.clone())))
            }
            Err(e) => Err(e),
        }
    }

    /// The single error phase: record the failure, settle the status, and
    /// always invoke `on_error`.
    fn fail(&self, error: SaveError) -> SaveError {
        {
            let mut current = self.status.lock();
            *current = status::fail(*current);
        }
        {
            let mut slot = self.error.lock();
            if slot.is_none() {
                *slot = Some(error.clone());
            }
        }

        warn!("save of {} failed: {}", self.filename, error);
        if let Some(hook) = &self.hooks.on_error {
            hook(&error);
        }
        error
    }

    fn create_blob(&self) -> Blob {
        let blob = Blob::new(self.data.clone(), self.mime_type.clone());
        if self.auto_bom {
            mime::with_bom(blob)
        } else {
            blob
        }
    }

    /// Release the transient handle after the grace delay. The session is
    /// the only component that revokes; the dispatcher just borrows the url.
    fn schedule_revoke(&self, object_url: String) {
        let env = Arc::clone(&self.env);
        let grace = self.revoke_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(e) = env.revoke_object_url(&object_url) {
                warn!("failed to revoke {}: {}", object_url, e);
            }
        });
    }
}
