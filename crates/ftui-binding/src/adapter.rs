#![forbid(unsafe_code)]

//! Validating adapters: a binding paired with the validator for its value.
//!
//! UI adapters (text fields, labels, toggles) read and write a binding; a
//! [`ValidatingAdapter`] adds the validation side so that a
//! [`PresentationModel`](crate::model::PresentationModel) can validate every
//! field uniformly. Messages produced by the adapter carry its key.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::binding::Binding;
use crate::event::BindingId;
use crate::validation::{ValidationResult, Validator};

struct AdapterInner<T> {
    id: BindingId,
    key: String,
    binding: Rc<dyn Binding<T>>,
    validator: Box<dyn Validator<T>>,
    last: RefCell<ValidationResult>,
}

/// A binding plus the validator that judges its value.
pub struct ValidatingAdapter<T> {
    inner: Rc<AdapterInner<T>>,
}

impl<T> Clone for ValidatingAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> ValidatingAdapter<T> {
    /// Validate `binding` with `validator`; messages are keyed with `key`.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        binding: impl Binding<T> + 'static,
        validator: impl Validator<T> + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(AdapterInner {
                id: BindingId::next(),
                key: key.into(),
                binding: Rc::new(binding),
                validator: Box::new(validator),
                last: RefCell::new(ValidationResult::new()),
            }),
        }
    }

    /// Identity of this adapter.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// Key stamped on this adapter's messages.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The adapted binding.
    #[must_use]
    pub fn binding(&self) -> Rc<dyn Binding<T>> {
        Rc::clone(&self.inner.binding)
    }

    /// Validate the binding's current value and remember the result.
    pub fn validate(&self) -> ValidationResult {
        let value = self.inner.binding.get();
        let mut result = ValidationResult::new();
        self.inner.validator.validate(&value, &mut result);
        result.assign_key(&self.inner.key);
        *self.inner.last.borrow_mut() = result.clone();
        result
    }

    /// Result of the most recent [`validate`](Self::validate).
    #[must_use]
    pub fn last_result(&self) -> ValidationResult {
        self.inner.last.borrow().clone()
    }
}

impl<T> fmt::Debug for ValidatingAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatingAdapter")
            .field("id", &self.inner.id)
            .field("key", &self.inner.key)
            .field("binding", &self.inner.binding.id())
            .field("messages", &self.inner.last.borrow().len())
            .finish()
    }
}
