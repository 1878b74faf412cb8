//! Interpreter roster entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;

use super::ids::{EnvironmentId, InterpreterId};

/// A staff interpreter available for assignment within one or more
/// [`crate::domain::environment::Environment`]s.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Interpreter {
    #[builder(default = InterpreterId::new())]
    pub id: InterpreterId,
    pub emp_code: String,
    pub display_name: String,
    #[builder(default = true)]
    pub is_active: bool,

    /// Language codes this interpreter can cover, e.g. `["en", "th"]`.
    #[builder(default)]
    pub languages: Vec<String>,

    pub environment_id: EnvironmentId,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Interpreter {
    pub fn supports_language(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(code))
    }

    pub fn is_eligible(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Interpreter {
        Interpreter::builder()
            .emp_code("E100".to_string())
            .display_name("Somchai".to_string())
            .languages(vec!["en".to_string(), "th".to_string()])
            .environment_id(EnvironmentId::new())
            .build()
    }

    #[test]
    fn new_interpreter_is_active_by_default() {
        assert!(sample().is_eligible());
    }

    #[test]
    fn inactive_interpreter_is_not_eligible() {
        let mut i = sample();
        i.is_active = false;
        assert!(!i.is_eligible());
    }

    #[test]
    fn language_match_is_case_insensitive() {
        assert!(sample().supports_language("EN"));
        assert!(!sample().supports_language("fr"));
    }
}
