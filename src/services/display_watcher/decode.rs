use crate::events::{SwitcherEvent, WindowManagerIdentity};
use x11rb::protocol::xproto::{Atom, Property, PropertyNotifyEvent, Window};

/// Что произошло с отслеживаемым свойством корневого окна
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedState {
    NewValue,
    Deleted,
}

/// Отбор PropertyNotify: только свойство `watched` на окне `root`
pub fn classify_property_notify(
    event: &PropertyNotifyEvent,
    root: Window,
    watched: Atom,
) -> Option<WatchedState> {
    if event.window != root || event.atom != watched {
        return None;
    }

    if event.state == Property::NEW_VALUE {
        Some(WatchedState::NewValue)
    } else if event.state == Property::DELETE {
        Some(WatchedState::Deleted)
    } else {
        None
    }
}

/// Изменение свойства _NET_SUPPORTING_WM_CHECK на корневом окне
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyChange {
    /// Новое значение; имя окна, на которое оно указывает
    NewValue(String),
    Deleted,
}

pub fn decode_property_change(change: PropertyChange) -> SwitcherEvent {
    match change {
        PropertyChange::NewValue(wm_name) => {
            SwitcherEvent::WmObserved(WindowManagerIdentity::from_wm_name(&wm_name))
        }
        PropertyChange::Deleted => SwitcherEvent::WmLost,
    }
}
