// live filtered views over a registry
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::notify::{Callback, Listeners};
use crate::core::registry::{Registry, RegistryChange};
use crate::core::types::{Named, names_match};

/// Emitted by a filter when its membership changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewChanged;

struct FilterState<T> {
    source: Registry<T>,
    label: String,
    predicate: Box<dyn Fn(&T) -> bool>,
    members: RefCell<Vec<T>>,
    listeners: Listeners<ViewChanged>,
    //kept alive here, the registry only holds it weakly
    _on_source: Callback<RegistryChange>,
}

impl<T: Clone + PartialEq> FilterState<T> {
    fn reevaluate(&self) -> bool {
        let fresh = self.source.collect_where(|x| (self.predicate)(x));
        let changed = {
            let mut members = self.members.borrow_mut();
            if *members == fresh {
                false
            } else {
                *members = fresh;
                true
            }
        };

        if changed {
            trace!(filter = %self.label, len = self.members.borrow().len(), "filter membership changed");
            self.listeners.notify(&ViewChanged);
        }
        changed
    }
}

/// Read-only view holding the items of a registry that satisfy a predicate,
/// in source order.
///
/// The view re-evaluates after every registry mutation and notifies its own
/// subscribers once per mutation, and only when the membership moved.
/// Dropping the filter detaches it from the registry.
pub struct NamedFilter<T> {
    state: Rc<FilterState<T>>,
}

impl<T: Clone + PartialEq + 'static> NamedFilter<T> {
    pub fn with_predicate(
        source: &Registry<T>,
        label: impl Into<String>,
        predicate: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        let predicate: Box<dyn Fn(&T) -> bool> = Box::new(predicate);
        let members = source.collect_where(|x| predicate(x));

        let state = Rc::new_cyclic(|weak: &Weak<FilterState<T>>| {
            let weak = weak.clone();
            let on_source: Callback<RegistryChange> = Rc::new(move |_: &RegistryChange| {
                if let Some(state) = weak.upgrade() {
                    state.reevaluate();
                }
            });
            source.subscribe(&on_source);

            FilterState {
                source: source.clone(),
                label: label.into(),
                predicate,
                members: RefCell::new(members),
                listeners: Listeners::new(),
                _on_source: on_source,
            }
        });

        NamedFilter { state }
    }

    /// Re-run the predicate over the source, for property changes made
    /// behind the registry's back. Returns whether the membership moved.
    pub fn refresh(&self) -> bool {
        self.state.reevaluate()
    }

    pub fn subscribe(&self, callback: &Callback<ViewChanged>) {
        self.state.listeners.subscribe(callback);
    }

    pub fn len(&self) -> usize {
        self.state.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.members.borrow().is_empty()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.members.borrow().clone()
    }

    pub fn first(&self) -> Option<T> {
        self.state.members.borrow().first().cloned()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.state.members.borrow().contains(item)
    }

    pub fn label(&self) -> &str {
        &self.state.label
    }
}

impl<T: Named + Clone + PartialEq + 'static> NamedFilter<T> {
    /// Items whose name equals `name`, ignoring case.
    pub fn by_name(source: &Registry<T>, name: &str) -> Self {
        let wanted = name.to_string();
        NamedFilter::with_predicate(source, name, move |item: &T| names_match(item.name(), &wanted))
    }
}
