// Engine orchestration — session lifecycle and delivery dispatch.

pub mod dispatch;
pub mod options;
pub mod session;
pub mod status;
