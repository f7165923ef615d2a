use serde::{Deserialize, Serialize};

const FAILURE_TERMS: [&str; 3] = ["error", "timeout", "not found"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub reason: String,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: "ok".to_string(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

/// Judges an otherwise successful observation.
pub trait ObservationValidator: Send + Sync {
    fn validate(&self, observation: &str) -> ValidationResult;
}

/// Rejects observations mentioning a failure term, case-insensitively.
#[derive(Clone, Debug)]
pub struct KeywordValidator {
    terms: Vec<String>,
}

impl KeywordValidator {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|term| term.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordValidator {
    fn default() -> Self {
        Self::new(FAILURE_TERMS)
    }
}

impl ObservationValidator for KeywordValidator {
    fn validate(&self, observation: &str) -> ValidationResult {
        let lower = observation.to_lowercase();
        match self.terms.iter().find(|term| lower.contains(term.as_str())) {
            Some(term) => ValidationResult::reject(format!("observation mentions '{term}'")),
            None => ValidationResult::pass(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_failure_terms_in_any_case() {
        let validator = KeywordValidator::default();
        assert!(validator.validate("navigated:https://example.com").passed);
        assert!(validator.validate("extract:title:Example Domain").passed);
        let verdict = validator.validate("extract:#msg:Element NOT FOUND");
        assert!(!verdict.passed);
        assert_eq!(verdict.reason, "observation mentions 'not found'");
        assert!(!validator.validate("Timeout while loading").passed);
    }
}
