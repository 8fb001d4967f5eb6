#![forbid(unsafe_code)]

//! Error types for binding access and commits.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | [`BindingAccessError`] | Bean has no such property, or it is read-only | Returned to caller |
//! | [`BindingError::ReadOnly`] | Write to a computed binding | Returned to caller |
//! | [`BindingError::Unbound`] | Write through a binding with no target | Returned to caller |
//! | [`BindingError::AbsentValue`] | `None` written to a bean property | Returned to caller |
//! | [`CommitFailure`] | Delegate write failed during `commit()` | Returned; binding stays buffering |
//!
//! A validator rejecting a value is not an error: it is recorded as a
//! [`ValidationMessage`](crate::validation::ValidationMessage) with
//! [`Severity::Error`](crate::validation::Severity::Error).

use std::fmt;

use crate::event::BindingId;

/// Why a bean property could not be accessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessErrorKind {
    /// The bean has no property with this name.
    NoSuchProperty,
    /// The property exists but has no writer.
    NotWritable,
}

/// Failure to read or write a named property of a bean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingAccessError {
    /// Type name of the bean that was accessed.
    pub type_name: &'static str,
    /// Property that was accessed.
    pub property: String,
    /// What went wrong.
    pub kind: AccessErrorKind,
}

impl BindingAccessError {
    /// The bean has no property named `property`.
    #[must_use]
    pub fn no_such_property(type_name: &'static str, property: impl Into<String>) -> Self {
        Self {
            type_name,
            property: property.into(),
            kind: AccessErrorKind::NoSuchProperty,
        }
    }

    /// The property named `property` cannot be written.
    #[must_use]
    pub fn not_writable(type_name: &'static str, property: impl Into<String>) -> Self {
        Self {
            type_name,
            property: property.into(),
            kind: AccessErrorKind::NotWritable,
        }
    }
}

impl fmt::Display for BindingAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AccessErrorKind::NoSuchProperty => {
                write!(f, "{} has no property '{}'", self.type_name, self.property)
            }
            AccessErrorKind::NotWritable => {
                write!(
                    f,
                    "property '{}' of {} is not writable",
                    self.property, self.type_name
                )
            }
        }
    }
}

impl std::error::Error for BindingAccessError {}

/// Errors from writing through a [`Binding`](crate::Binding).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingError {
    /// The underlying bean rejected the access.
    Access(BindingAccessError),
    /// The binding is derived and cannot be written.
    ReadOnly { binding: BindingId },
    /// The binding has no target to write to.
    Unbound { binding: BindingId },
    /// The binding was asked to store an absent value into a property that
    /// cannot hold one.
    AbsentValue { binding: BindingId },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access(err) => write!(f, "property access failed: {err}"),
            Self::ReadOnly { binding } => write!(f, "{binding} is read-only"),
            Self::Unbound { binding } => write!(f, "{binding} has no target"),
            Self::AbsentValue { binding } => {
                write!(f, "{binding} cannot store an absent value")
            }
        }
    }
}

impl std::error::Error for BindingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            Self::ReadOnly { .. } | Self::Unbound { .. } | Self::AbsentValue { .. } => None,
        }
    }
}

impl From<BindingAccessError> for BindingError {
    fn from(err: BindingAccessError) -> Self {
        Self::Access(err)
    }
}

/// A buffered binding failed to push its local value into its delegate.
///
/// The binding that produced this failure is still buffering and still holds
/// its local edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitFailure {
    /// The buffered binding whose commit failed.
    pub binding: BindingId,
    /// The delegate's write error.
    pub cause: BindingError,
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit of {} failed: {}", self.binding, self.cause)
    }
}

impl std::error::Error for CommitFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
