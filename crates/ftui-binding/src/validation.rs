#![forbid(unsafe_code)]

//! Severity-ranked validation messages and combinable validators.
//!
//! A [`Validator<T>`] inspects a value and appends [`ValidationMessage`]s to a
//! [`ValidationResult`]. Validators compose with [`And`] and [`Or`]. A message
//! of severity [`Severity::Error`] is how a rejected value is reported;
//! validation never returns `Err`.
//!
//! ```
//! use ftui_binding::validation::{self, Severity, ValidationResult, Validator};
//!
//! let name = validation::And::new()
//!     .with(validation::not_blank())
//!     .with(validation::max_chars(8));
//!
//! let mut result = ValidationResult::new();
//! name.validate(&"   ".to_string(), &mut result);
//! assert_eq!(result.severity(), Severity::Error);
//! ```
//!
//! # Combinator Semantics
//!
//! | Combinator | Passes when | Reports |
//! |------------|-------------|---------|
//! | [`And`] | every member passes | messages of every member |
//! | [`Or`] | some member passes | messages of the first passing member, or of all members if none passes |
//!
//! "Passes" means "adds no message of severity `Error` or worse".

use std::fmt;

/// Ranking of validation messages. Ordered from least to most severe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Severity {
    /// No problem.
    #[default]
    Ok,
    /// Informational note.
    Info,
    /// Suspicious but acceptable.
    Warning,
    /// The value is rejected.
    Error,
    /// The value is rejected and the model cannot continue.
    Fatal,
}

impl Severity {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationMessage {
    /// How bad it is.
    pub severity: Severity,
    /// The field or property the message refers to, if any.
    pub key: Option<String>,
    /// Human-readable text.
    pub text: String,
}

impl ValidationMessage {
    /// Unkeyed message.
    #[must_use]
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            key: None,
            text: text.into(),
        }
    }

    /// Attach a key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}: {}: {}", self.severity, key, self.text),
            None => write!(f, "{}: {}", self.severity, self.text),
        }
    }
}

/// Ordered collection of validation messages; the sink validators write to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    messages: Vec<ValidationMessage>,
}

impl ValidationResult {
    /// Empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn add(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    /// Append an error.
    pub fn add_error(&mut self, text: impl Into<String>) {
        self.add(ValidationMessage::new(Severity::Error, text));
    }

    /// Append a warning.
    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.add(ValidationMessage::new(Severity::Warning, text));
    }

    /// Append an informational note.
    pub fn add_info(&mut self, text: impl Into<String>) {
        self.add(ValidationMessage::new(Severity::Info, text));
    }

    /// Append every message of `other`, preserving order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.messages.extend(other.messages);
    }

    /// Set `key` on every message that has none.
    pub fn assign_key(&mut self, key: &str) {
        for message in &mut self.messages {
            if message.key.is_none() {
                message.key = Some(key.to_owned());
            }
        }
    }

    /// All messages, in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Messages carrying `key`.
    pub fn messages_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ValidationMessage> {
        self.messages
            .iter()
            .filter(move |m| m.key.as_deref() == Some(key))
    }

    /// Highest severity present; [`Severity::Ok`] when empty.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.messages
            .iter()
            .map(|m| m.severity)
            .max()
            .unwrap_or_default()
    }

    /// Whether any message is at least `threshold`.
    #[must_use]
    pub fn reaches(&self, threshold: Severity) -> bool {
        self.messages.iter().any(|m| m.severity >= threshold)
    }

    /// Whether any message is an error or worse.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.reaches(Severity::Error)
    }

    /// Whether any message is a warning or worse.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.reaches(Severity::Warning)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<ValidationMessage> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationMessage>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

/// Checks a value and reports findings into a [`ValidationResult`].
pub trait Validator<T> {
    /// Append findings about `value` to `result`.
    fn validate(&self, value: &T, result: &mut ValidationResult);
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T, &mut ValidationResult),
{
    fn validate(&self, value: &T, result: &mut ValidationResult) {
        self(value, result);
    }
}

/// Passes when every member passes; reports all members' messages.
pub struct And<T> {
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T> And<T> {
    /// No members yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Combine already boxed validators.
    #[must_use]
    pub fn from_boxed(validators: Vec<Box<dyn Validator<T>>>) -> Self {
        Self { validators }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Append another member.
    #[must_use]
    pub fn with(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl<T> Validator<T> for And<T> {
    fn validate(&self, value: &T, result: &mut ValidationResult) {
        for validator in &self.validators {
            validator.validate(value, result);
        }
    }
}

/// Passes when at least one member passes.
pub struct Or<T> {
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T> Or<T> {
    /// No members yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Combine already boxed validators.
    #[must_use]
    pub fn from_boxed(validators: Vec<Box<dyn Validator<T>>>) -> Self {
        Self { validators }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Append another alternative.
    #[must_use]
    pub fn with(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl<T> Validator<T> for Or<T> {
    fn validate(&self, value: &T, result: &mut ValidationResult) {
        let mut failures = ValidationResult::new();
        for validator in &self.validators {
            let mut attempt = ValidationResult::new();
            validator.validate(value, &mut attempt);
            if !attempt.has_errors() {
                result.merge(attempt);
                return;
            }
            failures.merge(attempt);
        }
        result.merge(failures);
    }
}

impl<T> Default for And<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Default for Or<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Report `text` at `severity` whenever `check` returns false.
pub fn predicate<T>(
    severity: Severity,
    text: impl Into<String>,
    check: impl Fn(&T) -> bool,
) -> impl Validator<T> {
    let text = text.into();
    move |value: &T, result: &mut ValidationResult| {
        if !check(value) {
            result.add(ValidationMessage::new(severity, text.clone()));
        }
    }
}

/// Error when an optional value is absent.
pub fn required<U>() -> impl Validator<Option<U>> {
    predicate(Severity::Error, "value is required", |v: &Option<U>| v.is_some())
}

/// Error when a string is empty or whitespace only.
pub fn not_blank() -> impl Validator<String> {
    predicate(Severity::Error, "value must not be blank", |s: &String| {
        !s.trim().is_empty()
    })
}

/// Error when a string has more than `max` characters.
pub fn max_chars(max: usize) -> impl Validator<String> {
    predicate(
        Severity::Error,
        format!("value must be at most {max} characters"),
        move |s: &String| s.chars().count() <= max,
    )
}

/// Error when a value falls outside `range`.
pub fn in_range<T: PartialOrd + fmt::Debug>(range: std::ops::RangeInclusive<T>) -> impl Validator<T> {
    let text = format!(
        "value must be between {:?} and {:?}",
        range.start(),
        range.end()
    );
    predicate(Severity::Error, text, move |v: &T| range.contains(v))
}
