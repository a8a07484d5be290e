//! Client-side draft validation
//!
//! Mirrors the checks the backend applies so bad drafts fail before a
//! request is made. Text is sanitised first (null bytes removed, trimmed,
//! overlong text truncated with a warning), then checked.

use crate::models::EmailDraft;
use crate::util::{char_len, truncate_chars};
use regex::{Regex, RegexSet};
use std::sync::OnceLock;

pub const MAX_SUBJECT_LENGTH: usize = 200;
pub const MAX_BODY_LENGTH: usize = 10_000;
pub const MAX_CTA_LENGTH: usize = 500;
pub const MAX_AUDIENCE_LENGTH: usize = 100;
pub const MIN_SUBJECT_LENGTH: usize = 3;
pub const MIN_BODY_LENGTH: usize = 10;
pub const MAX_SAMPLE_SIZE: u32 = 100;

/// Patterns that look like script or markup injection
const DANGEROUS_PATTERNS: &[&str] = &[
    r"(?i)<script[^>]*>.*?</script>",
    r"(?i)javascript:",
    r"(?i)on\w+\s*=",
    r"(?i)<iframe[^>]*>",
    r"(?i)eval\(",
    r"(?i)expression\(",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{field} must be at least {min} characters long")]
    TooShort { field: &'static str, min: usize },

    #[error("{0} contains potentially dangerous content")]
    Dangerous(&'static str),

    #[error("audience must contain only alphanumeric characters, hyphens, and underscores")]
    AudienceFormat,

    #[error("sample size must be between 1 and {max}, got {got}")]
    SampleSize { got: u32, max: u32 },
}

fn dangerous_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(DANGEROUS_PATTERNS).expect("dangerous patterns are valid"))
}

fn audience_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("audience pattern is valid"))
}

/// Remove null bytes, trim, and cap at `max_chars` characters
fn sanitize(field: &'static str, text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\0', "");
    let trimmed = cleaned.trim();

    let len = char_len(trimmed);
    if len > max_chars {
        tracing::warn!(field, from = len, to = max_chars, "Text truncated");
        return truncate_chars(trimmed, max_chars).to_string();
    }
    trimmed.to_string()
}

fn check_dangerous(field: &'static str, text: &str) -> Result<(), ValidationError> {
    if dangerous_patterns().is_match(text) {
        tracing::warn!(field, "Dangerous pattern detected");
        return Err(ValidationError::Dangerous(field));
    }
    Ok(())
}

pub fn validate_subject(subject: &str) -> Result<String, ValidationError> {
    if subject.trim().is_empty() {
        return Err(ValidationError::Empty("subject"));
    }
    let sanitized = sanitize("subject", subject, MAX_SUBJECT_LENGTH);
    if char_len(&sanitized) < MIN_SUBJECT_LENGTH {
        return Err(ValidationError::TooShort {
            field: "subject",
            min: MIN_SUBJECT_LENGTH,
        });
    }
    check_dangerous("subject", &sanitized)?;
    Ok(sanitized)
}

pub fn validate_body(body: &str) -> Result<String, ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::Empty("body"));
    }
    let sanitized = sanitize("body", body, MAX_BODY_LENGTH);
    if char_len(&sanitized) < MIN_BODY_LENGTH {
        return Err(ValidationError::TooShort {
            field: "body",
            min: MIN_BODY_LENGTH,
        });
    }
    check_dangerous("body", &sanitized)?;
    Ok(sanitized)
}

/// The call to action is optional; an empty one stays empty
pub fn validate_cta(cta: &str) -> Result<String, ValidationError> {
    let sanitized = sanitize("cta", cta, MAX_CTA_LENGTH);
    if !sanitized.is_empty() {
        check_dangerous("cta", &sanitized)?;
    }
    Ok(sanitized)
}

pub fn validate_audience(audience: &str) -> Result<String, ValidationError> {
    if audience.trim().is_empty() {
        return Err(ValidationError::Empty("audience"));
    }
    let sanitized = sanitize("audience", audience, MAX_AUDIENCE_LENGTH);
    if !audience_pattern().is_match(&sanitized) {
        return Err(ValidationError::AudienceFormat);
    }
    Ok(sanitized)
}

/// Validate every field and return the sanitised draft
pub fn validate_draft(draft: &EmailDraft) -> Result<EmailDraft, ValidationError> {
    if draft.sample_size == 0 || draft.sample_size > MAX_SAMPLE_SIZE {
        return Err(ValidationError::SampleSize {
            got: draft.sample_size,
            max: MAX_SAMPLE_SIZE,
        });
    }

    Ok(EmailDraft {
        subject: validate_subject(&draft.subject)?,
        body: validate_body(&draft.body)?,
        cta: validate_cta(&draft.cta)?,
        audience: validate_audience(&draft.audience)?,
        sample_size: draft.sample_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> EmailDraft {
        EmailDraft {
            subject: "  Webinar: AI in marketing ".to_string(),
            body: "Hi! We invite you to our exclusive webinar.".to_string(),
            cta: "Register".to_string(),
            audience: "marketing-managers".to_string(),
            sample_size: 10,
        }
    }

    #[test]
    fn test_valid_draft_is_trimmed() {
        let validated = validate_draft(&draft()).unwrap();
        assert_eq!(validated.subject, "Webinar: AI in marketing");
        assert_eq!(validated.sample_size, 10);
    }

    #[test]
    fn test_empty_and_short_subject() {
        assert_eq!(validate_subject("   "), Err(ValidationError::Empty("subject")));
        assert_eq!(
            validate_subject("Hi"),
            Err(ValidationError::TooShort {
                field: "subject",
                min: 3
            })
        );
    }

    #[test]
    fn test_null_bytes_removed() {
        assert_eq!(validate_subject("Sale\0 today").unwrap(), "Sale today");
    }

    #[test]
    fn test_long_body_is_truncated_not_rejected() {
        let body = "б".repeat(MAX_BODY_LENGTH + 50);
        let validated = validate_body(&body).unwrap();
        assert_eq!(char_len(&validated), MAX_BODY_LENGTH);
    }

    #[test]
    fn test_dangerous_content_rejected() {
        assert_eq!(
            validate_body("Click <script>alert(1)</script> now please"),
            Err(ValidationError::Dangerous("body"))
        );
        assert_eq!(
            validate_cta("JAVASCRIPT:void(0)"),
            Err(ValidationError::Dangerous("cta"))
        );
        assert_eq!(
            validate_subject("<img onerror = x>"),
            Err(ValidationError::Dangerous("subject"))
        );
    }

    #[test]
    fn test_script_pattern_matches_within_one_line() {
        assert_eq!(
            validate_body("Hi <SCRIPT type=x>alert(1)</Script> there"),
            Err(ValidationError::Dangerous("body"))
        );
        // `.` does not cross newlines, matching the backend's validator
        let spread = "Hi <script>\nalert(1)\n</script> there";
        assert_eq!(validate_body(spread).unwrap(), spread);
    }

    #[test]
    fn test_empty_cta_allowed() {
        assert_eq!(validate_cta("   ").unwrap(), "");
    }

    #[test]
    fn test_audience_format() {
        assert_eq!(validate_audience("devops_leads-2").unwrap(), "devops_leads-2");
        assert_eq!(
            validate_audience("devops leads"),
            Err(ValidationError::AudienceFormat)
        );
        assert_eq!(validate_audience(""), Err(ValidationError::Empty("audience")));
    }

    #[test]
    fn test_sample_size_bounds() {
        let mut d = draft();
        d.sample_size = 0;
        assert!(matches!(
            validate_draft(&d),
            Err(ValidationError::SampleSize { got: 0, .. })
        ));
        d.sample_size = MAX_SAMPLE_SIZE + 1;
        assert!(validate_draft(&d).is_err());
    }
}
