//! Scoping environment: which interpreters and admins a booking can draw on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;

use super::ids::EnvironmentId;

/// Scopes the candidate interpreter pool and admin roster for bookings that
/// belong to it (e.g. one department or site).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Environment {
    #[builder(default = EnvironmentId::new())]
    pub id: EnvironmentId,
    pub name: String,

    #[builder(default)]
    pub admin_emp_codes: Vec<String>,
    #[builder(default)]
    pub interpreter_emp_codes: Vec<String>,
    #[builder(default)]
    pub department_centers: Vec<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    pub fn is_admin(&self, emp_code: &str) -> bool {
        self.admin_emp_codes.iter().any(|c| c == emp_code)
    }
}
