//! Launcher service: asks the session's process supervisor to run a command.
//!
//! The only verb is `run_command`; what to run and when is decided by the
//! Switcher.

mod dry_run;
mod start_manager;
mod r#trait;

pub use self::r#trait::{create_launcher, Launcher};
