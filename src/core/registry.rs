// shared unmapped registries
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::notify::{Callback, Listeners};

/// What happened to a registry. One event per mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Added,
    Removed,
    Extended,
    Updated,
}

struct RegistryInner<T> {
    items: RefCell<Vec<T>>,
    listeners: Listeners<RegistryChange>,
}

/// Handle to one shared growable collection.
///
/// Cloning the handle shares the collection. Every mutation releases the
/// collection before subscribers run, so subscribers can read it (or mutate
/// it again) from inside their callback.
pub struct Registry<T> {
    inner: Rc<RegistryInner<T>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Registry {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Registry {
            inner: Rc::new(RegistryInner {
                items: RefCell::new(Vec::new()),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn subscribe(&self, callback: &Callback<RegistryChange>) {
        self.inner.listeners.subscribe(callback);
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Same underlying collection?
    pub fn ptr_eq(&self, other: &Registry<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn add(&self, item: T) {
        self.inner.items.borrow_mut().push(item);
        self.inner.listeners.notify(&RegistryChange::Added);
    }

    /// Append a batch with a single notification. An empty batch is silent.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        let added = {
            let mut v = self.inner.items.borrow_mut();
            let before = v.len();
            v.extend(items);
            v.len() - before
        };
        if added > 0 {
            self.inner.listeners.notify(&RegistryChange::Extended);
        }
    }

    /// Remove the first item matching `pred`, returning it.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let removed = {
            let mut v = self.inner.items.borrow_mut();
            let pos = v.iter().position(|x| pred(x));
            pos.map(|i| v.remove(i))
        };
        if removed.is_some() {
            self.inner.listeners.notify(&RegistryChange::Removed);
        }
        removed
    }

    /// Edit the first item matching `pred` in place. Dependent filters
    /// re-evaluate because the edit may touch what they match on.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, edit: impl FnOnce(&mut T)) -> bool {
        let updated = {
            let mut v = self.inner.items.borrow_mut();
            match v.iter_mut().find(|x| pred(x)) {
                Some(item) => {
                    edit(item);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.inner.listeners.notify(&RegistryChange::Updated);
        }
        updated
    }

    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.inner.items.borrow().iter().any(pred)
    }

    /// Items matching `pred`, in source order.
    pub fn collect_where(&self, pred: impl Fn(&T) -> bool) -> Vec<T>
    where
        T: Clone,
    {
        self.inner
            .items
            .borrow()
            .iter()
            .filter(|x| pred(x))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.items.borrow().clone()
    }
}

impl<T: PartialEq> Registry<T> {
    pub fn remove(&self, item: &T) -> bool {
        self.remove_where(|x| x == item).is_some()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.any(|x| x == item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(reg: &Registry<u32>) -> (Callback<RegistryChange>, Rc<RefCell<Vec<RegistryChange>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let cb: Callback<RegistryChange> = Rc::new(move |c: &RegistryChange| l.borrow_mut().push(*c));
        reg.subscribe(&cb);
        (cb, log)
    }

    #[test]
    fn clones_share_one_collection() {
        let a: Registry<u32> = Registry::new();
        let b = a.clone();
        a.add(1);
        b.add(2);
        assert_eq!(a.snapshot(), vec![1, 2]);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Registry::new()));
    }

    #[test]
    fn one_event_per_mutation_and_none_for_misses() {
        let reg: Registry<u32> = Registry::new();
        let (_cb, log) = recorder(&reg);

        reg.add(1);
        reg.extend([2, 3, 4]);
        reg.extend(Vec::new());
        assert!(reg.remove(&3));
        assert!(!reg.remove(&42));
        assert!(reg.update_where(|x| *x == 4, |x| *x = 40));
        assert!(!reg.update_where(|x| *x == 99, |x| *x = 0));

        assert_eq!(
            *log.borrow(),
            vec![
                RegistryChange::Added,
                RegistryChange::Extended,
                RegistryChange::Removed,
                RegistryChange::Updated,
            ]
        );
        assert_eq!(reg.snapshot(), vec![1, 2, 40]);
    }

    #[test]
    fn subscriber_can_read_and_mutate_during_notification() {
        let reg: Registry<u32> = Registry::new();
        let r = reg.clone();
        let cb: Callback<RegistryChange> = Rc::new(move |c: &RegistryChange| {
            //move every 1 to 100 exactly once
            if *c == RegistryChange::Added && r.contains(&1) {
                r.remove(&1);
                r.add(100);
            }
        });
        reg.subscribe(&cb);

        reg.add(1);
        assert_eq!(reg.snapshot(), vec![100]);
    }

    #[test]
    fn remove_takes_first_duplicate_only() {
        let reg: Registry<u32> = Registry::new();
        reg.extend([7, 7]);
        assert!(reg.remove(&7));
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(&7));
    }
}
