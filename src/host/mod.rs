// Host environment abstraction — pluggable bindings for whatever save capability the platform offers.

pub mod fs_host;
pub mod traits;
