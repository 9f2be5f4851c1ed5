pub mod builtins;
pub mod error;
pub mod sandbox;
pub mod types;
pub mod vetting;

pub use error::ScriptError;
pub use sandbox::{ScriptSandbox, ScriptSandboxConfig};
pub use types::{ScriptOutcome, ScriptRequest, ScriptStats, FAILED_RESULT};
pub use vetting::{find_violations, vet_source, DenyCategory, Violation};
