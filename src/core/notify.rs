// change notification plumbing shared by registries, filters and mappings
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Callback handle. Whoever subscribes keeps the `Rc`; dropping it unsubscribes.
pub type Callback<E> = Rc<dyn Fn(&E)>;

/// Weakly held subscribers, notified synchronously in registration order.
pub struct Listeners<E> {
    subscribers: RefCell<Vec<Weak<dyn Fn(&E)>>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Listeners {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, callback: &Callback<E>) {
        self.subscribers.borrow_mut().push(Rc::downgrade(callback));
    }

    /// Invoke every live subscriber. No borrow is held while callbacks run,
    /// so a callback may mutate whatever it observes or subscribe again.
    pub fn notify(&self, event: &E) {
        let live: Vec<Callback<E>> = {
            let mut subs = self.subscribers.borrow_mut();
            subs.retain(|w| w.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };

        for callback in live {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
