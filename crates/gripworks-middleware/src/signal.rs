//! Synchronous in-frame notifications with scoped subscriptions.
//!
//! A [`Signal`] delivers a value to every listener before
//! [`Signal::emit`] returns, in subscription order. Subscribing hands back a
//! [`Subscription`]; dropping it detaches the listener, so a listener lives
//! exactly as long as the component holding the guard.
//!
//! Every listener call is fault-contained: an `Err` return or a panic is
//! logged and counted, and delivery continues with the next listener.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use gripworks_middleware::signal::Signal;
//!
//! let signal: Signal<f32> = Signal::new("lever.value_changed");
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let sink = Rc::clone(&seen);
//! let guard = signal.subscribe(move |v: &f32| {
//!     sink.set(*v);
//!     Ok(())
//! });
//!
//! signal.emit(&0.75);
//! assert_eq!(seen.get(), 0.75);
//!
//! drop(guard);
//! signal.emit(&0.25);
//! assert_eq!(seen.get(), 0.75);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use gripworks_types::GripError;
use tracing::warn;

type Listener<T> = Rc<RefCell<dyn FnMut(&T) -> Result<(), GripError>>>;

struct Slots<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Outcome of a single [`Signal::emit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Listeners that returned `Ok`.
    pub delivered: usize,
    /// Listeners that returned `Err`, panicked, or were busy.
    pub failed: usize,
}

/// Single-threaded multicast notification. Cloning yields another handle to
/// the same listener list.
pub struct Signal<T> {
    name: Rc<str>,
    slots: Rc<RefCell<Slots<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T: 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no listeners. `name` only appears in logs.
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `listener`. It stays attached until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&T) -> Result<(), GripError> + 'static,
    {
        let listener: Listener<T> = Rc::new(RefCell::new(listener));
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.listeners.push((id, listener));
            id
        };

        let weak: Weak<RefCell<Slots<T>>> = Rc::downgrade(&self.slots);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.borrow_mut().listeners.retain(|(slot, _)| *slot != id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.slots.borrow().listeners.len()
    }

    /// Deliver `value` to every listener attached when the call starts.
    ///
    /// Listeners may subscribe or unsubscribe from inside the callback; the
    /// change takes effect from the next emit.
    pub fn emit(&self, value: &T) -> Delivery {
        let listeners: Vec<Listener<T>> = self
            .slots
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        let mut delivery = Delivery::default();
        for listener in listeners {
            let Ok(mut callback) = listener.try_borrow_mut() else {
                warn!(signal = %self.name, "listener is already running; skipped re-entrant delivery");
                delivery.failed += 1;
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| (*callback)(value))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(error)) => {
                    warn!(signal = %self.name, %error, "listener failed");
                    delivery.failed += 1;
                }
                Err(_) => {
                    warn!(signal = %self.name, "listener panicked");
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }
}

/// Guard that keeps a listener attached. Dropping it detaches the listener.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Detach now. Equivalent to dropping the guard.
    pub fn cancel(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}
