//! Global resize notifications.
//!
//! The host registers exactly one listener per mount and removes exactly that
//! listener on unmount, so other subscribers are never affected.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

pub trait ResizeEvents {
    fn add(&mut self, listener: Box<dyn FnMut()>) -> ListenerId;

    /// `false` when `id` was not registered (already removed).
    fn remove(&mut self, id: ListenerId) -> bool;
}

/// In-process listener registry, fed from `WindowEvent::Resized` on native builds.
#[derive(Default)]
pub struct ResizeListeners {
    next: u64,
    listeners: BTreeMap<ListenerId, Box<dyn FnMut()>>,
}

impl ResizeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call every listener in registration order.
    pub fn dispatch(&mut self) {
        for listener in self.listeners.values_mut() {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }
}

impl ResizeEvents for ResizeListeners {
    fn add(&mut self, listener: Box<dyn FnMut()>) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.listeners.insert(id, listener);
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }
}

/// Lets the event loop keep dispatching while the host owns the registry handle.
impl<R: ResizeEvents> ResizeEvents for std::rc::Rc<std::cell::RefCell<R>> {
    fn add(&mut self, listener: Box<dyn FnMut()>) -> ListenerId {
        self.borrow_mut().add(listener)
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        self.borrow_mut().remove(id)
    }
}

/// `resize` listeners on the browser window.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
pub struct WindowResizeEvents {
    next: u64,
    closures: BTreeMap<ListenerId, wasm_bindgen::closure::Closure<dyn FnMut()>>,
}

#[cfg(target_arch = "wasm32")]
impl WindowResizeEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(target_arch = "wasm32")]
impl ResizeEvents for WindowResizeEvents {
    fn add(&mut self, listener: Box<dyn FnMut()>) -> ListenerId {
        use wasm_bindgen::{JsCast, closure::Closure};

        let id = ListenerId(self.next);
        self.next += 1;
        let closure = Closure::wrap(listener);
        match web_sys::window() {
            Some(window) => {
                if let Err(e) = window
                    .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
                {
                    log::error!("could not register resize listener: {:?}", e);
                }
            }
            None => log::warn!("no window, resize listener will never fire"),
        }
        self.closures.insert(id, closure);
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        use wasm_bindgen::JsCast;

        let Some(closure) = self.closures.remove(&id) else {
            return false;
        };
        if let Some(window) = web_sys::window() {
            if let Err(e) = window
                .remove_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
            {
                log::error!("could not remove resize listener: {:?}", e);
            }
        }
        true
    }
}
