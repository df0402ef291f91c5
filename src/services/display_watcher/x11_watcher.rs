use crate::error::{Result, SwitcherError};
use crate::events::SwitcherEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConnectionExt, EventMask, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::decode::{
    classify_property_notify, decode_property_change, PropertyChange, WatchedState,
};
use super::r#trait::DisplayWatcherTrait;

/// Атомы, нужные наблюдателю; запрашиваются один раз при старте
struct WatchAtoms {
    supporting_wm_check: u32,
    net_wm_name: u32,
    utf8_string: u32,
}

impl WatchAtoms {
    fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            supporting_wm_check: conn.intern_atom(false, b"_NET_SUPPORTING_WM_CHECK")?.reply()?.atom,
            net_wm_name: conn.intern_atom(false, b"_NET_WM_NAME")?.reply()?.atom,
            utf8_string: conn.intern_atom(false, b"UTF8_STRING")?.reply()?.atom,
        })
    }
}

/// Подписка на PropertyNotify корневого окна
struct RootPropertyWatch {
    conn: RustConnection,
    root: Window,
    atoms: WatchAtoms,
}

impl RootPropertyWatch {
    fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| crate::switcher_error!(display_watch, "Экран {} не найден", screen_num))?;

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?
        .check()?;

        let atoms = WatchAtoms::new(&conn)?;
        info!("Подписка на PropertyNotify корневого окна 0x{:x} установлена", root);

        Ok(Self { conn, root, atoms })
    }

    /// Блокирующий цикл: события обрабатываются строго по порядку поступления
    fn run(self, events: &mpsc::Sender<SwitcherEvent>) -> Result<()> {
        loop {
            let event = self.conn.wait_for_event()?;

            let Event::PropertyNotify(event) = event else {
                continue;
            };
            let Some(state) =
                classify_property_notify(&event, self.root, self.atoms.supporting_wm_check)
            else {
                continue;
            };

            let change = match state {
                WatchedState::NewValue => match self.read_wm_name() {
                    Ok(wm_name) => {
                        debug!("Имя оконного менеджера: {:?}", wm_name);
                        PropertyChange::NewValue(wm_name)
                    }
                    Err(e) => {
                        warn!("Не удалось прочитать имя оконного менеджера: {}", e);
                        continue;
                    }
                },
                WatchedState::Deleted => {
                    debug!("Оконный менеджер потерян");
                    PropertyChange::Deleted
                }
            };

            if events.blocking_send(decode_property_change(change)).is_err() {
                info!("Очередь событий закрыта, наблюдение X11 остановлено");
                return Ok(());
            }
        }
    }

    fn read_wm_name(&self) -> Result<String> {
        let reply = self
            .conn
            .get_property(false, self.root, self.atoms.supporting_wm_check, AtomEnum::WINDOW, 0, 1)?
            .reply()?;

        let window = reply
            .value32()
            .and_then(|mut values| values.next())
            .ok_or_else(|| crate::switcher_error!(internal, "_NET_SUPPORTING_WM_CHECK без окна"))?;
        debug!("Окно оконного менеджера: 0x{:x}", window);

        let reply = self
            .conn
            .get_property(false, window, self.atoms.net_wm_name, self.atoms.utf8_string, 0, 1024)?
            .reply()?;
        if !reply.value.is_empty() {
            return Ok(String::from_utf8_lossy(&reply.value).into_owned());
        }

        // Старые оконные менеджеры выставляют только WM_NAME
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::STRING, 0, 1024)?
            .reply()?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }
}

pub struct X11DisplayWatcher {
    events: mpsc::Sender<SwitcherEvent>,
}

impl X11DisplayWatcher {
    pub fn new(events: mpsc::Sender<SwitcherEvent>) -> Self {
        Self { events }
    }

    pub async fn run(self) -> Result<()> {
        info!("Запуск отслеживания оконного менеджера через X11");

        let events = self.events;
        tokio::task::spawn_blocking(move || {
            // Ошибка на этапе настройки отключает только живое отслеживание
            let watch = RootPropertyWatch::connect()
                .map_err(|e| SwitcherError::DisplayWatch(e.to_string()))?;
            watch.run(&events)
        })
        .await
        .map_err(|e| crate::switcher_error!(internal, "Поток наблюдения X11 аварийно завершён: {}", e))?
    }
}

#[async_trait::async_trait]
impl DisplayWatcherTrait for X11DisplayWatcher {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run().await
    }
}
