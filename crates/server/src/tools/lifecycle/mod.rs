//! Lifecycle MCP tools.
//!
//! Install, activate and status for the controller's generation.

pub mod activate;
pub mod install;
pub mod status;

pub use activate::activate_impl;
pub use install::install_impl;
pub use status::status_impl;
