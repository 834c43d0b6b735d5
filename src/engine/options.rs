// Save options and lifecycle hooks.

use bytes::Bytes;

use crate::engine::session::SaveSession;
use crate::error::SaveError;

pub type DataHook = Box<dyn Fn(&Bytes) + Send + Sync>;
pub type SessionHook = Box<dyn Fn(&SaveSession) + Send + Sync>;
pub type ErrorHook = Box<dyn Fn(&SaveError) + Send + Sync>;

/// The optional lifecycle callbacks, each invoked at most once per session.
///
/// `on_before_save` sees the raw payload; `on_error` the failure; every
/// other hook the session itself.
#[derive(Default)]
pub struct SaveHooks {
    pub on_before_save: Option<DataHook>,
    pub on_start_save: Option<SessionHook>,
    pub on_end_save: Option<SessionHook>,
    pub on_after_save: Option<SessionHook>,
    pub on_abort: Option<SessionHook>,
    pub on_error: Option<ErrorHook>,
}

/// Options bound into a [`crate::Saver`] factory.
pub struct SaveOptions {
    /// Explicit MIME override; resolved against the table when it is not
    /// already a full `type/subtype` string.
    pub mime_type: Option<String>,
    /// Prepend a UTF-8 BOM for text/XML-like MIME types. Defaults to true.
    pub auto_bom: bool,
    pub hooks: SaveHooks,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            mime_type: None,
            auto_bom: true,
            hooks: SaveHooks::default(),
        }
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn auto_bom(mut self, auto_bom: bool) -> Self {
        self.auto_bom = auto_bom;
        self
    }

    pub fn on_before_save(mut self, hook: impl Fn(&Bytes) + Send + Sync + 'static) -> Self {
        self.hooks.on_before_save = Some(Box::new(hook));
        self
    }

    pub fn on_start_save(mut self, hook: impl Fn(&SaveSession) + Send + Sync + 'static) -> Self {
        self.hooks.on_start_save = Some(Box::new(hook));
        self
    }

    pub fn on_end_save(mut self, hook: impl Fn(&SaveSession) + Send + Sync + 'static) -> Self {
        self.hooks.on_end_save = Some(Box::new(hook));
        self
    }

    pub fn on_after_save(mut self, hook: impl Fn(&SaveSession) + Send + Sync + 'static) -> Self {
        self.hooks.on_after_save = Some(Box::new(hook));
        self
    }

    pub fn on_abort(mut self, hook: impl Fn(&SaveSession) + Send + Sync + 'static) -> Self {
        self.hooks.on_abort = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&SaveError) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Some(Box::new(hook));
        self
    }
}
