use crate::events::SwitcherEvent;
use crate::error::Result;
use tokio::sync::mpsc;

/// Trait for display watchers that can run in different modes
#[async_trait::async_trait]
pub trait DisplayWatcherTrait {
    /// Run the watcher until the display connection or the queue closes
    async fn run(self: Box<Self>) -> Result<()>;
}

/// Factory function to create an appropriate display watcher based on the dry_run flag
pub fn create_display_watcher(
    events: mpsc::Sender<SwitcherEvent>,
    dry_run: bool,
) -> Box<dyn DisplayWatcherTrait + Send> {
    if dry_run {
        Box::new(super::dry_run::DryRunDisplayWatcher::new(events))
    } else {
        Box::new(super::x11_watcher::X11DisplayWatcher::new(events))
    }
}
