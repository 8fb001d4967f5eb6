#![forbid(unsafe_code)]

//! Change events emitted by bindings.
//!
//! Every notification is a `(source, property, old, new)` tuple. Bindings
//! publish [`BindingEvent`]s, which are either a change of the `"value"`
//! property or a change of the `"buffering"` flag.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of the property carrying a binding's value.
pub const VALUE: &str = "value";

/// Name of the property carrying a buffered binding's dirty flag.
pub const BUFFERING: &str = "buffering";

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a binding.
///
/// Bindings are not interchangeable by value: two bindings holding equal
/// values are still distinct sources. Clones of a binding handle share the
/// same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(u64);

impl BindingId {
    /// Allocate a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

/// A single property change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyChange<V> {
    /// The binding that fired the change.
    pub source: BindingId,
    /// The property that changed (`"value"` or `"buffering"`).
    pub property: &'static str,
    /// Value before the change.
    pub old: V,
    /// Value after the change.
    pub new: V,
}

impl<V> PropertyChange<V> {
    /// Create a change record.
    #[must_use]
    pub fn new(source: BindingId, property: &'static str, old: V, new: V) -> Self {
        Self {
            source,
            property,
            old,
            new,
        }
    }
}

/// Notification fired by a [`Binding`](crate::Binding).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingEvent<T> {
    /// The exposed value changed.
    Value(PropertyChange<T>),
    /// The buffering flag changed.
    Buffering(PropertyChange<bool>),
}

impl<T> BindingEvent<T> {
    /// Build a `"value"` event.
    #[must_use]
    pub fn value(source: BindingId, old: T, new: T) -> Self {
        Self::Value(PropertyChange::new(source, VALUE, old, new))
    }

    /// Build a `"buffering"` event.
    #[must_use]
    pub fn buffering(source: BindingId, old: bool, new: bool) -> Self {
        Self::Buffering(PropertyChange::new(source, BUFFERING, old, new))
    }

    /// The binding that fired this event.
    #[must_use]
    pub fn source(&self) -> BindingId {
        match self {
            Self::Value(change) => change.source,
            Self::Buffering(change) => change.source,
        }
    }

    /// Name of the property that changed.
    #[must_use]
    pub fn property(&self) -> &'static str {
        match self {
            Self::Value(change) => change.property,
            Self::Buffering(change) => change.property,
        }
    }

    /// The value change, if this is a `"value"` event.
    #[must_use]
    pub fn as_value(&self) -> Option<&PropertyChange<T>> {
        match self {
            Self::Value(change) => Some(change),
            Self::Buffering(_) => None,
        }
    }

    /// The flag change, if this is a `"buffering"` event.
    #[must_use]
    pub fn as_buffering(&self) -> Option<&PropertyChange<bool>> {
        match self {
            Self::Value(_) => None,
            Self::Buffering(change) => Some(change),
        }
    }
}

/// A change of a named bean property, as reported by a
/// [`Bean`](crate::bean::Bean) to its per-property listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeanChange<T> {
    /// Property name.
    pub property: String,
    /// Value before the change.
    pub old: T,
    /// Value after the change.
    pub new: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_ids_are_unique() {
        let a = BindingId::next();
        let b = BindingId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn event_accessors() {
        let id = BindingId::next();
        let value = BindingEvent::value(id, 1, 2);
        assert_eq!(value.source(), id);
        assert_eq!(value.property(), VALUE);
        assert_eq!(value.as_value().map(|c| (c.old, c.new)), Some((1, 2)));
        assert!(value.as_buffering().is_none());

        let flag = BindingEvent::<i32>::buffering(id, false, true);
        assert_eq!(flag.property(), BUFFERING);
        assert!(flag.as_value().is_none());
        assert_eq!(flag.as_buffering().map(|c| c.new), Some(true));
    }

    #[test]
    fn display_binding_id() {
        let id = BindingId(7);
        assert_eq!(id.to_string(), "binding#7");
    }
}
