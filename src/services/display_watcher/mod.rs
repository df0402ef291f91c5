//! DisplayWatcher service: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for watching the root
//! window's `_NET_SUPPORTING_WM_CHECK` property and turning its changes into
//! SwitcherEvent(s) pushed into a bounded queue. It MUST NOT touch the
//! Switcher state directly. The queue's single consumer applies the events
//! in arrival order.

mod decode;
mod dry_run;
mod x11_watcher;
mod r#trait;

pub use self::r#trait::{create_display_watcher, DisplayWatcherTrait};
