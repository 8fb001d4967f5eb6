#![forbid(unsafe_code)]

//! Bindings that track a named property of a bean.
//!
//! A [`SourceTrackingBinding`] reads and writes one property of one
//! [`Bean`]. Both the bean and the property name can be switched at runtime;
//! each switch moves the single change subscription to the new target and
//! fires `"value"` if the effective value changed.
//!
//! The effective value is `Option<T>`: `None` while no source is set or while
//! the tracked property cannot be read.
//!
//! # Invariants
//!
//! 1. At most one subscription to the source is active at any time.
//! 2. Re-targeting drops the old subscription before installing the new one,
//!    so a change of the previously tracked property is never reported.
//! 3. A re-target that changes the effective value fires exactly one
//!    `"value"` event, after the new subscription is installed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::bean::Bean;
use crate::binding::Binding;
use crate::error::{BindingAccessError, BindingError};
use crate::event::{BeanChange, BindingEvent, BindingId};
use crate::observer::{ListenerRegistry, Subscription};

struct Target<T> {
    source: Option<Rc<dyn Bean<T>>>,
    property: String,
}

struct SourceInner<T> {
    id: BindingId,
    target: RefCell<Target<T>>,
    subscription: RefCell<Option<Subscription>>,
    /// Last effective value reported to listeners.
    last: RefCell<Option<T>>,
    listeners: ListenerRegistry<BindingEvent<Option<T>>>,
}

impl<T: Clone + PartialEq + 'static> SourceInner<T> {
    fn read_effective(&self) -> Option<T> {
        let target = self.target.borrow();
        let source = target.source.as_ref()?;
        source.read(&target.property).ok()
    }

    /// Record `next` as the effective value and fire if it changed.
    fn publish(&self, next: Option<T>) {
        let old = {
            let mut last = self.last.borrow_mut();
            if *last == next {
                return;
            }
            std::mem::replace(&mut *last, next.clone())
        };
        self.listeners
            .notify(&BindingEvent::value(self.id, old, next));
    }

    fn on_source_change(&self, change: &BeanChange<T>) {
        self.publish(Some(change.new.clone()));
    }
}

/// A binding onto the property `property_name` of a bean `source`.
pub struct SourceTrackingBinding<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for SourceTrackingBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> SourceTrackingBinding<T> {
    /// Track `property` of `source`.
    ///
    /// # Errors
    ///
    /// Fails if `source` has no such property. Use
    /// [`unbound`](Self::unbound) plus [`set_source`](Self::set_source) to
    /// build a binding whose target may be invalid.
    pub fn new(
        source: impl Bean<T> + 'static,
        property: impl Into<String>,
    ) -> Result<Self, BindingAccessError> {
        let binding = Self::unbound(property);
        binding.set_source(source)?;
        Ok(binding)
    }

    /// A binding for `property` with no source yet.
    #[must_use]
    pub fn unbound(property: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(SourceInner {
                id: BindingId::next(),
                target: RefCell::new(Target {
                    source: None,
                    property: property.into(),
                }),
                subscription: RefCell::new(None),
                last: RefCell::new(None),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Identity of this binding.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// Current property value, `None` without a readable target.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.read_effective()
    }

    /// Current property value.
    ///
    /// # Errors
    ///
    /// Fails if the source has no such property. Returns `Ok(None)` when no
    /// source is set.
    pub fn try_get(&self) -> Result<Option<T>, BindingAccessError> {
        let target = self.inner.target.borrow();
        match target.source.as_ref() {
            Some(source) => source.read(&target.property).map(Some),
            None => Ok(None),
        }
    }

    /// Write through to the source property.
    ///
    /// # Errors
    ///
    /// [`BindingError::Unbound`] without a source,
    /// [`BindingError::AbsentValue`] when asked to write `None`, and
    /// [`BindingError::Access`] if the bean rejects the write.
    pub fn set(&self, value: Option<T>) -> Result<(), BindingError> {
        let (source, property) = {
            let target = self.inner.target.borrow();
            (target.source.clone(), target.property.clone())
        };
        let Some(source) = source else {
            return Err(BindingError::Unbound {
                binding: self.inner.id,
            });
        };
        let Some(value) = value else {
            return Err(BindingError::AbsentValue {
                binding: self.inner.id,
            });
        };
        source.write(&property, value)?;
        Ok(())
    }

    /// Name of the tracked property.
    #[must_use]
    pub fn property_name(&self) -> String {
        self.inner.target.borrow().property.clone()
    }

    /// Whether a source is set.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.inner.target.borrow().source.is_some()
    }

    /// Track a different property of the current source.
    ///
    /// # Errors
    ///
    /// Fails if the source has no such property. The new name is still
    /// recorded and no subscription remains active.
    pub fn set_property_name(&self, property: impl Into<String>) -> Result<(), BindingAccessError> {
        let property = property.into();
        self.retarget(move |target| target.property = property)
    }

    /// Track the same property on a different source.
    ///
    /// # Errors
    ///
    /// Fails if the new source has no such property. The source is still
    /// recorded and no subscription remains active.
    pub fn set_source(&self, source: impl Bean<T> + 'static) -> Result<(), BindingAccessError> {
        let source: Rc<dyn Bean<T>> = Rc::new(source);
        self.retarget(move |target| target.source = Some(source))
    }

    /// Detach from the current source. Fires `"value"` if a value was visible.
    pub fn clear_source(&self) {
        // Without a source there is nothing to subscribe to, so this cannot fail.
        let _ = self.retarget(|target| target.source = None);
    }

    /// Number of active source subscriptions (0 or 1).
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        usize::from(self.inner.subscription.borrow().is_some())
    }

    fn retarget(&self, change: impl FnOnce(&mut Target<T>)) -> Result<(), BindingAccessError> {
        let previous = self.inner.subscription.borrow_mut().take();
        drop(previous);

        change(&mut *self.inner.target.borrow_mut());

        let (source, property) = {
            let target = self.inner.target.borrow();
            (target.source.clone(), target.property.clone())
        };
        let subscribed = match source {
            Some(source) => {
                let weak: Weak<SourceInner<T>> = Rc::downgrade(&self.inner);
                source
                    .subscribe(
                        &property,
                        Box::new(move |change: &BeanChange<T>| {
                            if let Some(inner) = weak.upgrade() {
                                inner.on_source_change(change);
                            }
                        }),
                    )
                    .map(Some)
            }
            None => Ok(None),
        };
        let result = match subscribed {
            Ok(sub) => {
                *self.inner.subscription.borrow_mut() = sub;
                Ok(())
            }
            Err(err) => Err(err),
        };
        trace!(
            binding = %self.inner.id,
            property = %property,
            subscribed = result.is_ok(),
            "source binding retargeted"
        );

        self.inner.publish(self.inner.read_effective());
        result
    }

    /// Number of listeners on this binding.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<Option<T>> for SourceTrackingBinding<T> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn get(&self) -> Option<T> {
        SourceTrackingBinding::get(self)
    }

    fn set(&self, value: Option<T>) -> Result<(), BindingError> {
        SourceTrackingBinding::set(self, value)
    }

    fn subscribe(&self, listener: Box<dyn Fn(&BindingEvent<Option<T>>)>) -> Subscription {
        self.inner.listeners.subscribe_boxed(listener)
    }
}

impl<T: fmt::Debug> fmt::Debug for SourceTrackingBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.inner.target.borrow();
        f.debug_struct("SourceTrackingBinding")
            .field("id", &self.inner.id)
            .field("property", &target.property)
            .field(
                "source",
                &target.source.as_ref().map(|source| source.type_name()),
            )
            .field("last", &*self.inner.last.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{BeanCell, BeanClass};
    use crate::error::AccessErrorKind;
    use crate::event::PropertyChange;

    struct Contact {
        name: String,
        city: String,
    }

    fn contact(name: &str, city: &str) -> BeanCell<Contact, String> {
        let class = Rc::new(
            BeanClass::new("Contact")
                .property("name", |c: &Contact| c.name.clone(), |c, v| c.name = v)
                .property("city", |c: &Contact| c.city.clone(), |c, v| c.city = v),
        );
        BeanCell::new(
            class,
            Contact {
                name: name.into(),
                city: city.into(),
            },
        )
    }

    fn record(
        binding: &SourceTrackingBinding<String>,
    ) -> (Rc<RefCell<Vec<BindingEvent<Option<String>>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = binding.observe(move |ev| sink.borrow_mut().push(ev.clone()));
        (log, sub)
    }

    #[test]
    fn reads_and_writes_property() {
        let bean = contact("Ada", "London");
        let binding = SourceTrackingBinding::new(bean.clone(), "name").unwrap();
        assert_eq!(binding.get(), Some("Ada".to_string()));

        binding.set(Some("Grace".into())).unwrap();
        assert_eq!(bean.read("name").unwrap(), "Grace");
    }

    #[test]
    fn bean_changes_are_reemitted() {
        let bean = contact("Ada", "London");
        let binding = SourceTrackingBinding::new(bean.clone(), "name").unwrap();
        let (log, _sub) = record(&binding);

        bean.write("name", "Grace".into()).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![BindingEvent::Value(PropertyChange::new(
                binding.id(),
                "value",
                Some("Ada".into()),
                Some("Grace".into()),
            ))]
        );
    }

    #[test]
    fn switching_property_fires_once_and_moves_subscription() {
        let bean = contact("Ada", "London");
        let binding = SourceTrackingBinding::new(bean.clone(), "name").unwrap();
        let (log, _sub) = record(&binding);

        binding.set_property_name("city").unwrap();
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(
            log.borrow()[0],
            BindingEvent::value(binding.id(), Some("Ada".into()), Some("London".into()))
        );
        assert_eq!(bean.listener_count("name"), 0);
        assert_eq!(bean.listener_count("city"), 1);

        bean.write("name", "Grace".into()).unwrap();
        assert_eq!(log.borrow().len(), 1, "old property must be unobserved");

        bean.write("city", "Paris".into()).unwrap();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn switching_to_equal_valued_property_is_silent() {
        let bean = contact("Paris", "Paris");
        let binding = SourceTrackingBinding::new(bean.clone(), "name").unwrap();
        let (log, _sub) = record(&binding);

        binding.set_property_name("city").unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(binding.subscription_count(), 1);
    }

    #[test]
    fn switching_source_rewires() {
        let first = contact("Ada", "London");
        let second = contact("Grace", "Arlington");
        let binding = SourceTrackingBinding::new(first.clone(), "name").unwrap();
        let (log, _sub) = record(&binding);

        binding.set_source(second.clone()).unwrap();
        assert_eq!(binding.get(), Some("Grace".into()));
        assert_eq!(first.listener_count("name"), 0);
        assert_eq!(second.listener_count("name"), 1);

        first.write("name", "Lin".into()).unwrap();
        second.write("name", "Hopper".into()).unwrap();

        let events = log.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            BindingEvent::value(binding.id(), Some("Grace".into()), Some("Hopper".into()))
        );
    }

    #[test]
    fn resubscribing_same_target_keeps_single_subscription() {
        let bean = contact("Ada", "London");
        let binding = SourceTrackingBinding::new(bean.clone(), "name").unwrap();
        binding.set_property_name("name").unwrap();
        binding.set_source(bean.clone()).unwrap();

        assert_eq!(bean.listener_count("name"), 1);
        let (log, _sub) = record(&binding);
        bean.write("name", "Grace".into()).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn missing_property_reports_type_and_name() {
        let bean = contact("Ada", "London");
        let binding = SourceTrackingBinding::new(bean.clone(), "name").unwrap();
        let (log, _sub) = record(&binding);

        let err = binding.set_property_name("phone").unwrap_err();
        assert_eq!(err.kind, AccessErrorKind::NoSuchProperty);
        assert_eq!(err.type_name, "Contact");
        assert_eq!(err.property, "phone");

        assert_eq!(binding.subscription_count(), 0);
        assert_eq!(binding.get(), None);
        assert!(binding.try_get().is_err());
        assert_eq!(
            *log.borrow(),
            vec![BindingEvent::value(binding.id(), Some("Ada".into()), None)]
        );
    }

    #[test]
    fn unbound_binding_and_clear_source() {
        let binding = SourceTrackingBinding::<String>::unbound("name");
        assert_eq!(binding.get(), None);
        assert_eq!(binding.try_get(), Ok(None));
        assert_eq!(
            binding.set(Some("x".into())),
            Err(BindingError::Unbound {
                binding: binding.id()
            })
        );

        let bean = contact("Ada", "London");
        binding.set_source(bean.clone()).unwrap();
        let (log, _sub) = record(&binding);
        binding.clear_source();

        assert!(!binding.has_source());
        assert_eq!(bean.listener_count("name"), 0);
        assert_eq!(
            *log.borrow(),
            vec![BindingEvent::value(binding.id(), Some("Ada".into()), None)]
        );
    }

    #[test]
    fn writing_none_is_rejected() {
        let bean = contact("Ada", "London");
        let binding = SourceTrackingBinding::new(bean, "name").unwrap();
        assert_eq!(
            binding.set(None),
            Err(BindingError::AbsentValue {
                binding: binding.id()
            })
        );
        assert_eq!(binding.get(), Some("Ada".into()));
    }

    #[test]
    fn read_only_property_surfaces_access_error() {
        struct Fixed;
        impl Bean<String> for Fixed {
            fn type_name(&self) -> &'static str {
                "Fixed"
            }
            fn has_property(&self, property: &str) -> bool {
                property == "label"
            }
            fn read(&self, property: &str) -> Result<String, BindingAccessError> {
                if property == "label" {
                    Ok("fixed".into())
                } else {
                    Err(BindingAccessError::no_such_property("Fixed", property))
                }
            }
            fn write(&self, property: &str, _value: String) -> Result<(), BindingAccessError> {
                Err(BindingAccessError::not_writable("Fixed", property))
            }
            fn subscribe(
                &self,
                property: &str,
                _listener: Box<dyn Fn(&BeanChange<String>)>,
            ) -> Result<Subscription, BindingAccessError> {
                if self.has_property(property) {
                    Ok(Subscription::empty())
                } else {
                    Err(BindingAccessError::no_such_property("Fixed", property))
                }
            }
        }

        let binding = SourceTrackingBinding::new(Fixed, "label").unwrap();
        assert_eq!(binding.get(), Some("fixed".into()));
        let err = binding.set(Some("other".into())).unwrap_err();
        assert_eq!(
            err,
            BindingError::Access(BindingAccessError::not_writable("Fixed", "label"))
        );
    }
}
