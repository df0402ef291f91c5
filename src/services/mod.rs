pub mod capability;
pub mod card_cache;
pub mod config_store;
pub mod dbus_service;
pub mod display_watcher;
pub mod launcher;
pub mod osd;
pub mod startup_listener;
pub mod switcher;

pub use capability::{CapabilityProber, SysfsPlatformProbe};
pub use card_cache::{CardInfoCache, SysfsCardSource};
pub use config_store::FileConfigStore;
pub use display_watcher::create_display_watcher;
pub use launcher::create_launcher;
pub use startup_listener::StartupListener;
pub use switcher::{Switcher, SwitcherDeps};
