use crate::error::Result;
use crate::events::{SwitcherEvent, WindowManagerIdentity};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::info;

use super::decode::{decode_property_change, PropertyChange};
use super::r#trait::DisplayWatcherTrait;

pub struct DryRunDisplayWatcher {
    events: mpsc::Sender<SwitcherEvent>,
}

impl DryRunDisplayWatcher {
    pub fn new(events: mpsc::Sender<SwitcherEvent>) -> Self {
        Self { events }
    }

    async fn run_impl(self) -> Result<()> {
        info!("Dry-run режим - DisplayWatcher работает в режиме эмуляции");

        let fake_wm_names = ["Mutter(DeepinGala)", "Metacity", "Openbox"];

        let mut wm_index = 0;
        let mut interval = interval(Duration::from_secs(10));

        loop {
            interval.tick().await;

            let wm_name = fake_wm_names[wm_index];
            info!("Dry-run: эмулируем смену оконного менеджера на: {}", wm_name);

            let event = decode_property_change(PropertyChange::NewValue(wm_name.to_string()));
            let executable = WindowManagerIdentity::from_wm_name(wm_name).executable();

            if self.events.send(event).await.is_err() {
                break;
            }
            if let Some(executable) = executable {
                let ready = SwitcherEvent::StartupReady(executable.to_string());
                if self.events.send(ready).await.is_err() {
                    break;
                }
            }

            wm_index = (wm_index + 1) % fake_wm_names.len();
        }

        info!("Dry-run: очередь событий закрыта, DisplayWatcher остановлен");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DisplayWatcherTrait for DryRunDisplayWatcher {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
