//! Browser channels (wasm32 only).
//!
//! - [`StorageEventTransport`]: the window `storage` event, fired by the
//!   browser in every other tab of the origin.
//! - [`WindowLocalChannel`]: a `local-storage-change` `CustomEvent` with
//!   `detail: { key }`, dispatched on the window after each local write so
//!   any script in the tab using the same protocol stays in sync.
//!
//! Event closures cannot leave the JS thread, so they live in a thread-local
//! table keyed by listener id and the transport handles stay `Send + Sync`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::event::{ChangeSignal, StorageEvent};
use crate::registry::{Listener, ListenerId};
use crate::transport::{LocalChannel, Transport};

/// Name of the same-context custom event.
pub const LOCAL_CHANGE_EVENT: &str = "local-storage-change";

const STORAGE_EVENT: &str = "storage";

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;

thread_local! {
    static HANDLERS: RefCell<HashMap<ListenerId, (&'static str, EventClosure)>> =
        RefCell::new(HashMap::new());
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn add_window_listener(
    event_name: &'static str,
    listener: Listener,
    to_signal: fn(&web_sys::Event) -> Option<ChangeSignal>,
) -> ListenerId {
    let id = ListenerId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let closure = EventClosure::new(move |event: web_sys::Event| {
        if let Some(signal) = to_signal(&event) {
            listener(&signal);
        }
    });

    match web_sys::window() {
        Some(window) => {
            if let Err(e) =
                window.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())
            {
                tracing::warn!(event = event_name, error = ?e, "failed to add window listener");
            }
        }
        None => tracing::warn!(event = event_name, "no window to listen on"),
    }

    HANDLERS.with(|handlers| handlers.borrow_mut().insert(id, (event_name, closure)));
    id
}

fn remove_window_listener(id: ListenerId) -> bool {
    let Some((event_name, closure)) = HANDLERS.with(|handlers| handlers.borrow_mut().remove(&id))
    else {
        return false;
    };

    if let Some(window) = web_sys::window() {
        let _ = window
            .remove_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
    }
    true
}

fn storage_signal(event: &web_sys::Event) -> Option<ChangeSignal> {
    let event = event.dyn_ref::<web_sys::StorageEvent>()?;
    Some(ChangeSignal::Storage(StorageEvent {
        key: event.key(),
        old_value: event.old_value(),
        new_value: event.new_value(),
    }))
}

fn local_signal(event: &web_sys::Event) -> Option<ChangeSignal> {
    let event = event.dyn_ref::<web_sys::CustomEvent>()?;
    let key = js_sys::Reflect::get(&event.detail(), &JsValue::from_str("key"))
        .ok()?
        .as_string()?;
    Some(ChangeSignal::local(key))
}

/// The window `storage` event as a cross-context transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct StorageEventTransport;

impl Transport for StorageEventTransport {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        add_window_listener(STORAGE_EVENT, listener, storage_signal)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        remove_window_listener(id)
    }
}

/// Same-context channel over a window `CustomEvent`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowLocalChannel;

impl Transport for WindowLocalChannel {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        add_window_listener(LOCAL_CHANGE_EVENT, listener, local_signal)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        remove_window_listener(id)
    }
}

impl LocalChannel for WindowLocalChannel {
    fn announce(&self, key: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let detail = js_sys::Object::new();
        if js_sys::Reflect::set(&detail, &JsValue::from_str("key"), &JsValue::from_str(key))
            .is_err()
        {
            return;
        }

        let init = web_sys::CustomEventInit::new();
        init.set_detail(&detail);

        match web_sys::CustomEvent::new_with_event_init_dict(LOCAL_CHANGE_EVENT, &init) {
            Ok(event) => {
                if let Err(e) = window.dispatch_event(&event) {
                    tracing::warn!(key, error = ?e, "failed to dispatch local change event");
                }
            }
            Err(e) => tracing::warn!(key, error = ?e, "failed to build local change event"),
        }
    }
}
