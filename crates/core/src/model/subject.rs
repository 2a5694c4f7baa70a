use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::ids::SubjectId;

/// Subjects that are always offered, whatever the user has deleted.
pub const DEFAULT_SUBJECTS: [&str; 6] = ["Maths", "Physique", "Anglais", "Info", "Histoire", "Autre"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,
}

/// Validated subject name (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectName(String);

impl SubjectName {
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, SubjectError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        DEFAULT_SUBJECTS.contains(&self.0.as_str())
    }
}

impl std::fmt::Display for SubjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-defined subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    name: SubjectName,
}

impl Subject {
    #[must_use]
    pub fn new(id: SubjectId, name: SubjectName) -> Self {
        Self { id, name }
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &SubjectName {
        &self.name
    }
}

/// Defaults plus user subjects, without duplicates, sorted by name.
#[must_use]
pub fn merge_subjects(user_defined: &[Subject]) -> Vec<String> {
    DEFAULT_SUBJECTS
        .iter()
        .map(|s| (*s).to_owned())
        .chain(user_defined.iter().map(|s| s.name().as_str().to_owned()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: u64, name: &str) -> Subject {
        Subject::new(SubjectId::new(id), SubjectName::new(name).unwrap())
    }

    #[test]
    fn name_is_trimmed_and_non_empty() {
        assert_eq!(SubjectName::new("  CGE ").unwrap().as_str(), "CGE");
        assert_eq!(SubjectName::new("   "), Err(SubjectError::EmptyName));
    }

    #[test]
    fn defaults_are_always_present() {
        let merged = merge_subjects(&[]);
        assert_eq!(merged, vec!["Anglais", "Autre", "Histoire", "Info", "Maths", "Physique"]);
    }

    #[test]
    fn user_subjects_are_merged_without_duplicates() {
        let merged = merge_subjects(&[subject(1, "MHO"), subject(2, "Maths"), subject(3, "CGE")]);
        assert_eq!(
            merged,
            vec!["Anglais", "Autre", "CGE", "Histoire", "Info", "MHO", "Maths", "Physique"]
        );
    }

    #[test]
    fn default_detection() {
        assert!(SubjectName::new("Info").unwrap().is_default());
        assert!(!SubjectName::new("Méca").unwrap().is_default());
    }
}
