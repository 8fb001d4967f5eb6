#![forbid(unsafe_code)]

//! Named, observable properties of domain objects.
//!
//! There is no runtime introspection here. A type exposes its properties by
//! implementing [`Bean<T>`]: read, write, and subscribe to a property by name,
//! with typed failures for names it does not know. A struct with properties of
//! several types may implement `Bean<T>` once per value type.
//!
//! For plain structs, [`BeanClass`] is a hand-written table of getter/setter
//! functions and [`BeanCell`] wraps a struct value with such a table, turning
//! it into a shared, observable bean:
//!
//! ```
//! use ftui_binding::bean::{Bean, BeanCell, BeanClass};
//! use std::rc::Rc;
//!
//! struct Person { first: String, last: String }
//!
//! let class = Rc::new(
//!     BeanClass::new("Person")
//!         .property("first", |p: &Person| p.first.clone(), |p, v| p.first = v)
//!         .property("last", |p: &Person| p.last.clone(), |p, v| p.last = v),
//! );
//! let ada = BeanCell::new(class, Person { first: "Ada".into(), last: "King".into() });
//! ada.write("last", "Lovelace".into()).unwrap();
//! assert_eq!(ada.read("last").unwrap(), "Lovelace");
//! assert!(ada.read("age").is_err());
//! ```
//!
//! # Invariants
//!
//! 1. A bean fires a [`BeanChange`] for a property iff its value changed.
//! 2. Listeners for one property never see changes of another property.
//! 3. Listeners run after the bean's state has been updated and released, so
//!    they may read the bean back.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::BindingAccessError;
use crate::event::BeanChange;
use crate::observer::{ListenerRegistry, Subscription};

/// Capability to access named properties of type `T` on an object.
pub trait Bean<T> {
    /// Type name used in error messages.
    fn type_name(&self) -> &'static str;

    /// Whether a property of this name exists.
    fn has_property(&self, property: &str) -> bool;

    /// Read a property.
    ///
    /// # Errors
    ///
    /// [`AccessErrorKind::NoSuchProperty`](crate::error::AccessErrorKind::NoSuchProperty)
    /// if the property does not exist.
    fn read(&self, property: &str) -> Result<T, BindingAccessError>;

    /// Write a property, notifying its listeners if the value changed.
    ///
    /// # Errors
    ///
    /// `NoSuchProperty` if it does not exist, `NotWritable` if it has no writer.
    fn write(&self, property: &str, value: T) -> Result<(), BindingAccessError>;

    /// Observe changes of a single property.
    ///
    /// # Errors
    ///
    /// `NoSuchProperty` if it does not exist.
    fn subscribe(
        &self,
        property: &str,
        listener: Box<dyn Fn(&BeanChange<T>)>,
    ) -> Result<Subscription, BindingAccessError>;
}

impl<T, B: Bean<T> + ?Sized> Bean<T> for Rc<B> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn has_property(&self, property: &str) -> bool {
        (**self).has_property(property)
    }

    fn read(&self, property: &str) -> Result<T, BindingAccessError> {
        (**self).read(property)
    }

    fn write(&self, property: &str, value: T) -> Result<(), BindingAccessError> {
        (**self).write(property, value)
    }

    fn subscribe(
        &self,
        property: &str,
        listener: Box<dyn Fn(&BeanChange<T>)>,
    ) -> Result<Subscription, BindingAccessError> {
        (**self).subscribe(property, listener)
    }
}

// ---------------------------------------------------------------------------
// PropertyChangeSupport
// ---------------------------------------------------------------------------

/// Per-property listener registries for a bean.
///
/// Beans embed one of these and call [`fire`](Self::fire) from their writers.
pub struct PropertyChangeSupport<T> {
    registries: RefCell<Vec<(String, Rc<ListenerRegistry<BeanChange<T>>>)>>,
}

impl<T: Clone + PartialEq + 'static> PropertyChangeSupport<T> {
    /// Create support with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registries: RefCell::new(Vec::new()),
        }
    }

    fn registry(&self, property: &str) -> Option<Rc<ListenerRegistry<BeanChange<T>>>> {
        self.registries
            .borrow()
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, registry)| Rc::clone(registry))
    }

    /// Register a listener for `property`.
    pub fn subscribe(&self, property: &str, listener: Box<dyn Fn(&BeanChange<T>)>) -> Subscription {
        let registry = match self.registry(property) {
            Some(registry) => registry,
            None => {
                let registry = Rc::new(ListenerRegistry::new());
                self.registries
                    .borrow_mut()
                    .push((property.to_owned(), Rc::clone(&registry)));
                registry
            }
        };
        registry.subscribe_boxed(listener)
    }

    /// Notify `property` listeners if `old != new`. Returns whether it fired.
    pub fn fire(&self, property: &str, old: T, new: T) -> bool {
        if old == new {
            return false;
        }
        if let Some(registry) = self.registry(property) {
            registry.notify(&BeanChange {
                property: property.to_owned(),
                old,
                new,
            });
        }
        true
    }

    /// Number of listeners on `property`.
    #[must_use]
    pub fn listener_count(&self, property: &str) -> usize {
        self.registry(property).map_or(0, |registry| registry.len())
    }
}

impl<T: Clone + PartialEq + 'static> Default for PropertyChangeSupport<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PropertyChangeSupport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registries = self.registries.borrow();
        f.debug_map()
            .entries(registries.iter().map(|(name, reg)| (name, reg.len())))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BeanClass / BeanCell
// ---------------------------------------------------------------------------

/// Getter and optional setter for one property of `S`.
pub struct PropertyDescriptor<S, T> {
    name: &'static str,
    getter: fn(&S) -> T,
    setter: Option<fn(&mut S, T)>,
}

impl<S, T> PropertyDescriptor<S, T> {
    /// Property name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the property has a setter.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

/// Table of the `T`-typed properties of a struct `S`.
pub struct BeanClass<S, T> {
    type_name: &'static str,
    properties: Vec<PropertyDescriptor<S, T>>,
}

impl<S, T> BeanClass<S, T> {
    /// Empty table for a type called `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
        }
    }

    /// Empty table named after `S`.
    #[must_use]
    pub fn of() -> Self {
        Self::new(std::any::type_name::<S>())
    }

    /// Add a read/write property.
    #[must_use]
    pub fn property(mut self, name: &'static str, getter: fn(&S) -> T, setter: fn(&mut S, T)) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            getter,
            setter: Some(setter),
        });
        self
    }

    /// Add a read-only property.
    #[must_use]
    pub fn read_only(mut self, name: &'static str, getter: fn(&S) -> T) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            getter,
            setter: None,
        });
        self
    }

    /// Look up a property by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PropertyDescriptor<S, T>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Declared properties, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor<S, T>> {
        self.properties.iter()
    }

    /// Type name used in errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<S, T> fmt::Debug for BeanClass<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("type_name", &self.type_name)
            .field(
                "properties",
                &self.properties.iter().map(|p| p.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

struct BeanCellInner<S, T> {
    class: Rc<BeanClass<S, T>>,
    state: RefCell<S>,
    support: PropertyChangeSupport<T>,
}

/// A shared struct value exposed as a [`Bean`] through a [`BeanClass`].
pub struct BeanCell<S, T> {
    inner: Rc<BeanCellInner<S, T>>,
}

impl<S, T> Clone for BeanCell<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: 'static, T: Clone + PartialEq + 'static> BeanCell<S, T> {
    /// Wrap `state` with the property table `class`.
    #[must_use]
    pub fn new(class: Rc<BeanClass<S, T>>, state: S) -> Self {
        Self {
            inner: Rc::new(BeanCellInner {
                class,
                state: RefCell::new(state),
                support: PropertyChangeSupport::new(),
            }),
        }
    }

    /// Borrow the wrapped struct.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Mutate the wrapped struct directly, then notify every property whose
    /// value changed, in declaration order.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let class = &self.inner.class;
        let before: Vec<T> = {
            let state = self.inner.state.borrow();
            class.properties.iter().map(|p| (p.getter)(&state)).collect()
        };
        let (result, after) = {
            let mut state = self.inner.state.borrow_mut();
            let result = f(&mut state);
            let after: Vec<T> = class.properties.iter().map(|p| (p.getter)(&state)).collect();
            (result, after)
        };
        for ((prop, old), new) in class.properties.iter().zip(before).zip(after) {
            self.inner.support.fire(prop.name, old, new);
        }
        result
    }

    /// Number of listeners on `property`.
    #[must_use]
    pub fn listener_count(&self, property: &str) -> usize {
        self.inner.support.listener_count(property)
    }

    fn descriptor(&self, property: &str) -> Result<&PropertyDescriptor<S, T>, BindingAccessError> {
        self.inner
            .class
            .find(property)
            .ok_or_else(|| BindingAccessError::no_such_property(self.inner.class.type_name, property))
    }
}

impl<S: 'static, T: Clone + PartialEq + 'static> Bean<T> for BeanCell<S, T> {
    fn type_name(&self) -> &'static str {
        self.inner.class.type_name
    }

    fn has_property(&self, property: &str) -> bool {
        self.inner.class.find(property).is_some()
    }

    fn read(&self, property: &str) -> Result<T, BindingAccessError> {
        let desc = self.descriptor(property)?;
        Ok((desc.getter)(&self.inner.state.borrow()))
    }

    fn write(&self, property: &str, value: T) -> Result<(), BindingAccessError> {
        let desc = self.descriptor(property)?;
        let setter = desc.setter.ok_or_else(|| {
            BindingAccessError::not_writable(self.inner.class.type_name, property)
        })?;
        let (old, new) = {
            let mut state = self.inner.state.borrow_mut();
            let old = (desc.getter)(&state);
            setter(&mut state, value);
            (old, (desc.getter)(&state))
        };
        self.inner.support.fire(desc.name, old, new);
        Ok(())
    }

    fn subscribe(
        &self,
        property: &str,
        listener: Box<dyn Fn(&BeanChange<T>)>,
    ) -> Result<Subscription, BindingAccessError> {
        let desc = self.descriptor(property)?;
        Ok(self.inner.support.subscribe(desc.name, listener))
    }
}

impl<S: fmt::Debug, T> fmt::Debug for BeanCell<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanCell")
            .field("type_name", &self.inner.class.type_name)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
