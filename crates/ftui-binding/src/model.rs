#![forbid(unsafe_code)]

//! Presentation models: uniform commit, flush, and validation over a set of
//! bindings and adapters.
//!
//! A [`PresentationModel`] holds its members in registration order and fans
//! every model-wide operation out in that order:
//!
//! - [`commit_data`](PresentationModel::commit_data) commits every buffered
//!   member, collecting failures without stopping.
//! - [`flush_data`](PresentationModel::flush_data) flushes every buffered
//!   member.
//! - [`validate`](PresentationModel::validate) validates every validating
//!   member and recomputes the model's `valid` signal.
//!
//! # Invariants
//!
//! 1. Fan-out order equals registration order.
//! 2. One member's commit failure never prevents later members from
//!    committing.
//! 3. Validation listeners fire exactly once per recomputation, never once
//!    per member.
//! 4. `is_valid()` is true iff the last aggregated result has no message at
//!    or above the configured threshold (initially true).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::adapter::ValidatingAdapter;
use crate::binding::ValueBinding;
use crate::buffered::BufferedBinding;
use crate::computed::ComputedBinding;
use crate::config::ModelConfig;
use crate::error::CommitFailure;
use crate::event::BindingId;
use crate::observer::{ListenerRegistry, Subscription};
use crate::source::SourceTrackingBinding;
use crate::validation::ValidationResult;

/// A participant in a [`PresentationModel`].
///
/// Every hook has a no-op default; members implement the ones they support.
pub trait ModelMember {
    /// Identity of the member.
    fn member_id(&self) -> BindingId;

    /// Whether the member takes part in commit/flush.
    fn is_buffered(&self) -> bool {
        false
    }

    /// Whether the member currently holds uncommitted edits.
    fn is_buffering(&self) -> bool {
        false
    }

    /// Push buffered edits to the object of record.
    ///
    /// # Errors
    ///
    /// The member's own commit failure.
    fn commit(&self) -> Result<(), CommitFailure> {
        Ok(())
    }

    /// Discard buffered edits.
    fn flush(&self) {}

    /// Validate, or `None` if the member does not validate.
    fn validate(&self) -> Option<ValidationResult> {
        None
    }
}

impl<T: Clone + PartialEq + 'static> ModelMember for ValueBinding<T> {
    fn member_id(&self) -> BindingId {
        self.id()
    }
}

impl<T: Clone + PartialEq + 'static> ModelMember for ComputedBinding<T> {
    fn member_id(&self) -> BindingId {
        self.id()
    }
}

impl<T: Clone + PartialEq + 'static> ModelMember for SourceTrackingBinding<T> {
    fn member_id(&self) -> BindingId {
        self.id()
    }
}

impl<T: Clone + PartialEq + 'static> ModelMember for BufferedBinding<T> {
    fn member_id(&self) -> BindingId {
        self.id()
    }

    fn is_buffered(&self) -> bool {
        true
    }

    fn is_buffering(&self) -> bool {
        BufferedBinding::is_buffering(self)
    }

    fn commit(&self) -> Result<(), CommitFailure> {
        BufferedBinding::commit(self)
    }

    fn flush(&self) {
        BufferedBinding::flush(self);
    }
}

impl<T: 'static> ModelMember for ValidatingAdapter<T> {
    fn member_id(&self) -> BindingId {
        self.id()
    }

    fn validate(&self) -> Option<ValidationResult> {
        Some(ValidatingAdapter::validate(self))
    }
}

/// A commit failure of one member, with the member's registration position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberFailure {
    /// Zero-based registration position of the failing member.
    pub position: usize,
    /// What went wrong.
    pub failure: CommitFailure,
}

/// Outcome of [`PresentationModel::commit_data`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Number of buffered members that committed successfully.
    pub committed: usize,
    /// Failures, in registration order. Empty means success.
    pub failures: Vec<MemberFailure>,
}

impl CommitReport {
    /// Whether every member committed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(committed)` on success, the report itself otherwise.
    ///
    /// # Errors
    ///
    /// The report, when any member failed.
    pub fn into_result(self) -> Result<usize, CommitReport> {
        if self.is_success() {
            Ok(self.committed)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for CommitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} committed, {} failed",
            self.committed,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "; member {}: {}", failure.position, failure.failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommitReport {}

/// Notification sent to validation listeners after each recomputation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationEvent {
    /// Validity before the recomputation.
    pub old_valid: bool,
    /// Validity after the recomputation.
    pub valid: bool,
    /// Aggregated messages, in member order.
    pub result: ValidationResult,
}

#[derive(Debug)]
struct ValidationState {
    valid: bool,
    result: ValidationResult,
}

/// Coordinates a group of bindings and adapters.
pub struct PresentationModel {
    config: ModelConfig,
    members: Vec<Rc<dyn ModelMember>>,
    validation: RefCell<ValidationState>,
    listeners: ListenerRegistry<ValidationEvent>,
}

impl PresentationModel {
    /// Empty model with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// Empty model with an explicit policy.
    #[must_use]
    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            members: Vec::new(),
            validation: RefCell::new(ValidationState {
                valid: true,
                result: ValidationResult::new(),
            }),
            listeners: ListenerRegistry::new(),
        }
    }

    /// The model's policy.
    #[must_use]
    pub fn config(&self) -> ModelConfig {
        self.config
    }

    /// Append a member.
    pub fn add(&mut self, member: impl ModelMember + 'static) -> &mut Self {
        self.members.push(Rc::new(member));
        self
    }

    /// Append a validating adapter.
    pub fn add_adapter<T: 'static>(&mut self, adapter: ValidatingAdapter<T>) -> &mut Self {
        self.add(adapter)
    }

    /// Commit every buffered member in registration order.
    ///
    /// Failures are collected, not propagated; every member gets its turn.
    pub fn commit_data(&self) -> CommitReport {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("model_commit", members = self.members.len()).entered();

        let mut report = CommitReport::default();
        for (position, member) in self.members.iter().enumerate() {
            if !member.is_buffered() {
                continue;
            }
            match member.commit() {
                Ok(()) => report.committed += 1,
                Err(failure) => {
                    warn!(position, member = %member.member_id(), error = %failure, "member commit failed");
                    report.failures.push(MemberFailure { position, failure });
                }
            }
        }
        debug!(
            committed = report.committed,
            failed = report.failures.len(),
            "model commit finished"
        );

        if self.config.validate_after_commit {
            self.validate();
        }
        report
    }

    /// Flush every buffered member in registration order.
    pub fn flush_data(&self) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("model_flush", members = self.members.len()).entered();

        let mut flushed = 0usize;
        for member in self.members.iter().filter(|m| m.is_buffered()) {
            member.flush();
            flushed += 1;
        }
        debug!(flushed, "model flush finished");

        if self.config.validate_after_flush {
            self.validate();
        }
    }

    /// Validate every validating member and recompute validity.
    ///
    /// Returns the new validity.
    pub fn validate(&self) -> bool {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("model_validate", members = self.members.len()).entered();

        let mut result = ValidationResult::new();
        for member in &self.members {
            if let Some(member_result) = member.validate() {
                result.merge(member_result);
            }
        }
        let valid = !result.reaches(self.config.error_threshold);

        let old_valid = {
            let mut state = self.validation.borrow_mut();
            let old_valid = state.valid;
            state.valid = valid;
            state.result = result.clone();
            old_valid
        };
        debug!(
            valid,
            messages = result.len(),
            severity = %result.severity(),
            "model validated"
        );
        self.listeners.notify(&ValidationEvent {
            old_valid,
            valid,
            result,
        });
        valid
    }

    /// Observe validity recomputations. Drop the subscription to stop.
    pub fn add_validation_listener(
        &self,
        listener: impl Fn(&ValidationEvent) + 'static,
    ) -> Subscription {
        self.listeners.subscribe(listener)
    }

    /// Validity as of the last [`validate`](Self::validate).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation.borrow().valid
    }

    /// Aggregated messages as of the last [`validate`](Self::validate).
    #[must_use]
    pub fn validation_result(&self) -> ValidationResult {
        self.validation.borrow().result.clone()
    }

    /// Whether any member holds uncommitted edits.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.members.iter().any(|m| m.is_buffering())
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the model has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Default for PresentationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PresentationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationModel")
            .field("members", &self.members.len())
            .field("valid", &self.validation.borrow().valid)
            .field("config", &self.config)
            .finish()
    }
}
