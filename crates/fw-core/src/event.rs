//! Change emitters: the only reactivity primitive of the document.
//!
//! Listeners are registered with [`Emitter::on`] and removed by disposing the
//! returned [`Subscription`]. `fire` fans out synchronously in registration
//! order over a snapshot, so a listener may unsubscribe itself while firing.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Listener<T> = Rc<dyn Fn(&T)>;
type ListenerList<T> = RefCell<Vec<(u64, Listener<T>)>>;

pub struct Emitter<T> {
    listeners: Rc<ListenerList<T>>,
    next_id: Cell<u64>,
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    /// Register a listener. It stays registered until the subscription is
    /// disposed or the emitter is dropped.
    pub fn on(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));

        let weak: Weak<ListenerList<T>> = Rc::downgrade(&self.listeners);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(list) = weak.upgrade() {
                    list.borrow_mut().retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    pub fn fire(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`Emitter::on`]. Dropping it keeps the listener alive;
/// call [`Subscription::dispose`] to unregister.
#[must_use = "dropping a Subscription does not unregister the listener; call dispose()"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap an unregister action, for listener lists kept outside an
    /// [`Emitter`].
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn dispose(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }

    /// Keep the listener registered for the emitter's whole lifetime.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}
