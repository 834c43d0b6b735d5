// Delivery dispatch — picks exactly one host mechanism to hand the bytes over.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::CONFIRMATION_MESSAGE;
use crate::error::SaveError;
use crate::host::traits::{Blob, HostCaps, HostEnv};

/// Data uris are relabelled as attachments so the browser offers a download
/// instead of rendering the payload inline.
static DATA_URI_PREFIX_REGEXP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:[^;]*;").expect("valid regexp"));

/// Everything a strategy needs to deliver one payload.
pub struct DeliveryRequest<'a> {
    pub blob: &'a Blob,
    pub object_url: &'a str,
    pub filename: &'a str,
    /// Prefer in-context navigation over a new browsing context.
    pub force_load: bool,
    /// Host capability flags, as probed when the plan was built.
    pub caps: HostCaps,
    /// Re-checked after asynchronous work: delivery is suppressed once the
    /// session has been cancelled.
    pub cancelled: &'a (dyn Fn() -> bool + Send + Sync),
}

/// One specific host mechanism for handing bytes to the user.
#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy applies given the probed capabilities and the
    /// session's navigation preference.
    fn applies(&self, caps: &HostCaps, force_load: bool) -> bool;

    /// Execute the delivery, returning the delivered handle.
    async fn deliver(
        &self,
        env: &dyn HostEnv,
        req: DeliveryRequest<'_>,
    ) -> Result<String, SaveError>;
}

/// Direct "save blob under filename" primitive.
struct NativeSave;

#[async_trait]
impl DeliveryStrategy for NativeSave {
    fn name(&self) -> &'static str {
        "native-save"
    }

    fn applies(&self, caps: &HostCaps, _force_load: bool) -> bool {
        caps.native_save
    }

    async fn deliver(
        &self,
        env: &dyn HostEnv,
        req: DeliveryRequest<'_>,
    ) -> Result<String, SaveError> {
        env.save_blob(req.blob, req.filename)?;
        Ok(req.object_url.to_string())
    }
}

/// Download-attribute anchor with a synthesized click.
struct AnchorDownload;

#[async_trait]
impl DeliveryStrategy for AnchorDownload {
    fn name(&self) -> &'static str {
        "anchor-download"
    }

    fn applies(&self, caps: &HostCaps, _force_load: bool) -> bool {
        caps.anchor_download
    }

    async fn deliver(
        &self,
        env: &dyn HostEnv,
        req: DeliveryRequest<'_>,
    ) -> Result<String, SaveError> {
        env.click_download_link(req.object_url, req.filename)?;
        Ok(req.object_url.to_string())
    }
}

/// Asynchronous blob-to-data-uri read followed by navigation.
struct DataUriReader;

#[async_trait]
impl DeliveryStrategy for DataUriReader {
    fn name(&self) -> &'static str {
        "data-uri-reader"
    }

    fn applies(&self, caps: &HostCaps, force_load: bool) -> bool {
        // Kept as a literal three-way disjunction; the middle term couples
        // forced navigation to the safari-like engine signature.
        caps.constrained_webkit || (force_load && caps.safari_like) || caps.data_uri_reader
    }

    async fn deliver(
        &self,
        env: &dyn HostEnv,
        req: DeliveryRequest<'_>,
    ) -> Result<String, SaveError> {
        if req.blob.is_empty() {
            return Err(SaveError::EmptyPayload);
        }

        let raw = env.read_as_data_uri(req.blob).await?;

        if (req.cancelled)() {
            debug!("session cancelled while reading data uri, suppressing delivery");
            return Err(SaveError::Aborted(req.filename.to_string()));
        }

        let uri = if req.caps.constrained_webkit {
            raw
        } else {
            DATA_URI_PREFIX_REGEXP
                .replace(&raw, "data:attachment/file;")
                .into_owned()
        };

        open_or_navigate(env, &uri, req.force_load)?;
        Ok(uri)
    }
}

/// Last resort: navigate to the object url, or open it in a new context.
struct Navigation;

#[async_trait]
impl DeliveryStrategy for Navigation {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn applies(&self, _caps: &HostCaps, _force_load: bool) -> bool {
        true
    }

    async fn deliver(
        &self,
        env: &dyn HostEnv,
        req: DeliveryRequest<'_>,
    ) -> Result<String, SaveError> {
        open_or_navigate(env, req.object_url, req.force_load)?;
        Ok(req.object_url.to_string())
    }
}

/// Forced navigation goes straight to the current context; otherwise try a
/// new browsing context first and fall back behind a confirmation prompt
/// when it is blocked.
fn open_or_navigate(env: &dyn HostEnv, url: &str, force_load: bool) -> Result<(), SaveError> {
    if force_load {
        env.navigate(url)?;
        return Ok(());
    }

    if env.open_window(url)? {
        return Ok(());
    }

    if env.confirm(CONFIRMATION_MESSAGE) {
        env.navigate(url)?;
    }
    Ok(())
}

/// The priority-ordered strategy list for one host environment.
///
/// Capabilities are probed exactly once, when the plan is built; every
/// session dispatched through the plan sees the same flags.
pub struct DeliveryPlan {
    caps: HostCaps,
    strategies: Vec<Box<dyn DeliveryStrategy>>,
}

impl DeliveryPlan {
    /// Probe the host and build the ordered strategy list.
    pub fn probe(env: &dyn HostEnv) -> Self {
        Self {
            caps: env.capabilities(),
            strategies: vec![
                Box::new(NativeSave),
                Box::new(AnchorDownload),
                Box::new(DataUriReader),
                Box::new(Navigation),
            ],
        }
    }

    pub fn caps(&self) -> &HostCaps {
        &self.caps
    }

    /// Name of the strategy a session with this navigation preference would
    /// be delivered through.
    pub fn selected(&self, force_load: bool) -> Option<&'static str> {
        self.strategies
            .iter()
            .find(|s| s.applies(&self.caps, force_load))
            .map(|s| s.name())
    }

    /// Run exactly one strategy: the first whose capability branch matches.
    pub async fn dispatch(
        &self,
        env: &dyn HostEnv,
        req: DeliveryRequest<'_>,
    ) -> Result<String, SaveError> {
        for strategy in &self.strategies {
            if strategy.applies(&self.caps, req.force_load) {
                debug!("delivering {} via {}", req.filename, strategy.name());
                return strategy.deliver(env, req).await;
            }
        }

        // Navigation always applies, so this is only reachable with a
        // misconfigured plan.
        Err(SaveError::Host("no delivery strategy available".into()))
    }
}
