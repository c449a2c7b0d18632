//! Form-field and file-upload validation.

use regex::Regex;
use std::collections::BTreeMap;

/// Declarative rules for one form field.
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
  /// Label used in error messages.
  pub label: String,
  pub required: bool,
  pub min_length: Option<usize>,
  pub pattern: Option<Regex>,
}

impl FieldRule {
  pub fn new(label: &str) -> Self {
    Self {
      label: label.to_string(),
      ..Default::default()
    }
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub fn min_length(mut self, len: usize) -> Self {
    self.min_length = Some(len);
    self
  }

  pub fn pattern(mut self, pattern: Regex) -> Self {
    self.pattern = Some(pattern);
    self
  }
}

/// Validate form values against per-field rules, collecting every error.
///
/// Length and pattern rules only apply when a value is present; a blank
/// value trips only the required rule.
pub fn validate_form(
  values: &BTreeMap<String, String>,
  rules: &BTreeMap<String, FieldRule>,
) -> Vec<String> {
  let mut errors = Vec::new();

  for (field, rule) in rules {
    let value = values.get(field).map(String::as_str).unwrap_or("");

    if rule.required && value.trim().is_empty() {
      errors.push(format!("{} is required", rule.label));
    }

    if value.is_empty() {
      continue;
    }

    if let Some(min) = rule.min_length {
      if value.chars().count() < min {
        errors.push(format!("{} must be at least {} characters", rule.label, min));
      }
    }

    if let Some(pattern) = &rule.pattern {
      if !pattern.is_match(value) {
        errors.push(format!("{} is not valid", rule.label));
      }
    }
  }

  errors
}

/// Size and type policy for an upload slot.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
  pub max_bytes: u64,
  pub allowed_types: Vec<String>,
}

impl UploadPolicy {
  /// Image uploads: 2 MiB, common web image formats.
  pub fn images() -> Self {
    Self {
      max_bytes: 2 * 1024 * 1024,
      allowed_types: ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/svg+xml"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
  }

  /// Font uploads: 5 MiB, web font formats.
  pub fn fonts() -> Self {
    Self {
      max_bytes: 5 * 1024 * 1024,
      allowed_types: [
        "font/ttf",
        "font/otf",
        "application/font-woff",
        "application/font-woff2",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
    }
  }

  /// Check a candidate file, collecting every violated rule.
  pub fn check(&self, size: u64, mime_type: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if size > self.max_bytes {
      errors.push(format!(
        "File must not be larger than {}MB",
        self.max_bytes / 1024 / 1024
      ));
    }

    if !self.allowed_types.iter().any(|t| t == mime_type) {
      errors.push("File format is not supported".to_string());
    }

    errors
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rules() -> BTreeMap<String, FieldRule> {
    let mut rules = BTreeMap::new();
    rules.insert("name".to_string(), FieldRule::new("Name").required().min_length(3));
    rules.insert(
      "email".to_string(),
      FieldRule::new("Email")
        .required()
        .pattern(Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()),
    );
    rules
  }

  fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_valid_form_has_no_errors() {
    let errors = validate_form(&values(&[("name", "Sara"), ("email", "sara@example.com")]), &rules());
    assert!(errors.is_empty());
  }

  #[test]
  fn test_missing_required_fields_collect_all_errors() {
    let errors = validate_form(&values(&[]), &rules());
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.contains("Name")));
    assert!(errors.iter().any(|e| e.contains("Email")));
  }

  #[test]
  fn test_min_length_only_applies_to_present_values() {
    let errors = validate_form(&values(&[("name", "ab"), ("email", "a@b.co")]), &rules());
    assert_eq!(errors, vec!["Name must be at least 3 characters".to_string()]);
  }

  #[test]
  fn test_pattern_rejects_malformed_value() {
    let errors = validate_form(&values(&[("name", "Sara"), ("email", "not-an-email")]), &rules());
    assert_eq!(errors, vec!["Email is not valid".to_string()]);
  }

  #[test]
  fn test_image_policy() {
    let policy = UploadPolicy::images();

    assert!(policy.check(1024, "image/png").is_empty());
    assert_eq!(policy.check(3 * 1024 * 1024, "image/png").len(), 1);
    assert_eq!(policy.check(1024, "application/pdf").len(), 1);
    assert_eq!(policy.check(3 * 1024 * 1024, "application/pdf").len(), 2);
  }

  #[test]
  fn test_font_policy_allows_larger_files() {
    let policy = UploadPolicy::fonts();

    assert!(policy.check(4 * 1024 * 1024, "font/ttf").is_empty());
    assert!(!policy.check(6 * 1024 * 1024, "font/ttf").is_empty());
  }
}
