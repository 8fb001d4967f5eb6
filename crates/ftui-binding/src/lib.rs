#![forbid(unsafe_code)]

//! Buffered property bindings for FrankenTUI forms.
//!
//! A form edits values that live in some object of record. This crate lets
//! widgets edit a *buffer* in front of that object instead, and decide later
//! whether to push the edits through ([`BufferedBinding::commit`]) or throw
//! them away ([`BufferedBinding::flush`]).
//!
//! - [`Binding`]: the shared capability: read, write, observe.
//! - [`ValueBinding`]: a plain observable holder.
//! - [`ComputedBinding`]: a read-only value derived from other bindings.
//! - [`SourceTrackingBinding`]: a binding onto a named property of a
//!   retargetable [`Bean`].
//! - [`BufferedBinding`]: a binding that buffers edits in front of a
//!   delegate and tracks a `buffering` flag.
//! - [`ValidatingAdapter`] + [`PresentationModel`]: per-field validation and
//!   model-wide commit/flush/validate fan-out.
//!
//! # Architecture
//!
//! Every binding is a cheap `Clone` handle over `Rc` shared state; the crate
//! is single-threaded. Listener registries dispatch over a snapshot of the
//! callbacks, so a callback may subscribe, unsubscribe, or write back into
//! the binding that is notifying it. Bindings that listen to other bindings
//! hold only `Weak` references from inside their callbacks, so a delegate
//! never keeps its buffer alive.
//!
//! # Invariants
//!
//! 1. A change event is emitted only when the old and new values differ.
//! 2. Listeners are notified in registration order.
//! 3. A buffered binding that is not buffering reports exactly its
//!    delegate's value.
//! 4. A buffered binding's `value` event precedes its `buffering` event when
//!    one operation changes both.
//! 5. Dropping a [`Subscription`] removes the callback before the next
//!    notification.

pub mod adapter;
pub mod bean;
pub mod binding;
pub mod buffered;
pub mod computed;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod observer;
pub mod source;
pub mod validation;

pub use adapter::ValidatingAdapter;
pub use bean::{Bean, BeanCell, BeanClass, PropertyChangeSupport, PropertyDescriptor};
pub use binding::{Binding, BindingScope, ValueBinding};
pub use buffered::BufferedBinding;
pub use computed::ComputedBinding;
#[cfg(feature = "policy-config")]
pub use config::ConfigError;
pub use config::ModelConfig;
pub use error::{AccessErrorKind, BindingAccessError, BindingError, CommitFailure};
pub use event::{BeanChange, BindingEvent, BindingId, PropertyChange};
pub use model::{CommitReport, MemberFailure, ModelMember, PresentationModel, ValidationEvent};
pub use observer::{ListenerRegistry, Subscription};
pub use source::SourceTrackingBinding;
pub use validation::{
    And, Or, Severity, ValidationMessage, ValidationResult, Validator,
};
