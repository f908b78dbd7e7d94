//! Sandbox-side half of desk-pilot: coordinate scaling, the remote desktop
//! capability interface, sandbox provisioning, and action execution.

pub mod executor;
pub mod provision;
pub mod resolution;
pub mod surface;

pub use executor::ActionExecutor;
pub use provision::{SandboxHandle, SandboxProvisioner, SANDBOX_TIMEOUT_MS};
pub use resolution::ResolutionScaler;
pub use surface::{DesktopSurface, HttpDesktop};
