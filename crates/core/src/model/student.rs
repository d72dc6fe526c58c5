use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::StudentId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentError {
    #[error("student name cannot be empty")]
    EmptyName,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// A registered student, the owner of a watch history.
///
/// Credentials and sessions live in the external auth collaborator; the core
/// only needs enough identity to attribute histories and render reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    name: String,
    email: String,
    joined_at: DateTime<Utc>,
}

impl Student {
    /// Creates a validated student.
    ///
    /// # Errors
    ///
    /// Returns `StudentError::EmptyName` for a blank name and
    /// `StudentError::InvalidEmail` when the address fails the coarse
    /// `local@domain` shape check (full RFC validation is not a goal).
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        email: impl Into<String>,
        joined_at: DateTime<Utc>,
    ) -> Result<Self, StudentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StudentError::EmptyName);
        }

        let email = email.into();
        if !is_plausible_email(&email) {
            return Err(StudentError::InvalidEmail(email));
        }

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            email: email.trim().to_owned(),
            joined_at,
        })
    }

    /// Rebuilds a student from persisted fields.
    ///
    /// # Errors
    ///
    /// Applies the same validation as [`Student::new`]; a stored row that no
    /// longer passes it surfaces as an error rather than a half-valid entity.
    pub fn from_persisted(
        id: StudentId,
        name: String,
        email: String,
        joined_at: DateTime<Utc>,
    ) -> Result<Self, StudentError> {
        Self::new(id, name, email, joined_at)
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.trim().is_empty()
        && !domain.trim().is_empty()
        && !domain.contains('@')
        && domain.contains('.')
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
