//! Field-level validation for registration submissions.

use regex::{Regex, RegexBuilder};
use serde::{Serialize, ser::SerializeStruct};
use thiserror::Error;

// ─── Field errors ────────────────────────────────────────────────────────────

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
  #[error("This field is required.")]
  Required(&'static str),
  #[error("Enter an email address in the organization's domain.")]
  EmailFormatInvalid,
  #[error("That email address is already in use.")]
  EmailAlreadyUsed,
  #[error("Username already taken.")]
  UsernameAlreadyUsed,
  #[error("Passwords must match.")]
  PasswordMismatch,
  #[error("That job is not available.")]
  RoleUnavailable,
}

impl FieldError {
  /// The form field this error is reported against.
  pub fn field(&self) -> &'static str {
    match self {
      Self::Required(field) => *field,
      Self::EmailFormatInvalid | Self::EmailAlreadyUsed => "email",
      Self::UsernameAlreadyUsed => "username",
      Self::PasswordMismatch => "confirmation",
      Self::RoleUnavailable => "role_id",
    }
  }
}

impl Serialize for FieldError {
  fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    let mut st = s.serialize_struct("FieldError", 2)?;
    st.serialize_field("field", self.field())?;
    st.serialize_field("message", &self.to_string())?;
    st.end()
  }
}

/// Every field error found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn push(&mut self, error: FieldError) {
    if !self.0.contains(&error) {
      self.0.push(error);
    }
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, error: &FieldError) -> bool { self.0.contains(error) }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  /// `Ok(())` when nothing was recorded.
  pub fn into_result(self) -> crate::Result<()> {
    if self.is_empty() { Ok(()) } else { Err(crate::Error::Validation(self)) }
  }
}

impl From<Vec<FieldError>> for ValidationErrors {
  fn from(errors: Vec<FieldError>) -> Self {
    let mut out = Self::default();
    for e in errors {
      out.push(e);
    }
    out
  }
}

impl std::fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut first = true;
    for e in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      write!(f, "{}: {e}", e.field())?;
      first = false;
    }
    Ok(())
  }
}

// ─── Email policy ────────────────────────────────────────────────────────────

/// Accepts only addresses in the organization's domain.
#[derive(Debug, Clone)]
pub struct EmailPolicy {
  pattern: Regex,
  domain:  String,
}

impl EmailPolicy {
  /// Build the policy for `domain`, e.g. `"org.example"`. The domain is
  /// matched literally and case-insensitively.
  pub fn new(domain: &str) -> Result<Self, regex::Error> {
    let domain = domain.trim().trim_start_matches('@').to_ascii_lowercase();
    let pattern = RegexBuilder::new(&format!(
      r"^[A-Za-z0-9._%+-]+@{}$",
      regex::escape(&domain)
    ))
    .case_insensitive(true)
    .build()?;
    Ok(Self { pattern, domain })
  }

  pub fn domain(&self) -> &str { &self.domain }

  pub fn accepts(&self, email: &str) -> bool { self.pattern.is_match(email) }
}
