use std::sync::Arc;

use study_core::model::{Subject, SubjectName, merge_subjects};
use storage::repository::{StorageError, SubjectRepository};

use crate::error::SubjectServiceError;

/// Subject list: fixed defaults plus the user's own subjects.
#[derive(Clone)]
pub struct SubjectService {
    subjects: Arc<dyn SubjectRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(subjects: Arc<dyn SubjectRepository>) -> Self {
        Self { subjects }
    }

    /// Defaults merged with user subjects, sorted and without duplicates.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if subjects cannot be loaded.
    pub async fn subject_names(&self) -> Result<Vec<String>, SubjectServiceError> {
        let user_defined = self.subjects.list_subjects().await?;
        Ok(merge_subjects(&user_defined))
    }

    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` for a blank name,
    /// `SubjectServiceError::AlreadyExists` for a duplicate, or
    /// `SubjectServiceError::Storage`.
    pub async fn add_subject(&self, name: &str) -> Result<Subject, SubjectServiceError> {
        let name = SubjectName::new(name)?;
        match self.subjects.insert_subject(&name).await {
            Ok(subject) => Ok(subject),
            Err(StorageError::Conflict) => Err(SubjectServiceError::AlreadyExists(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a user subject. Default subjects stay listed regardless.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if no user subject has that
    /// name, or `SubjectServiceError::Storage`.
    pub async fn remove_subject(&self, name: &str) -> Result<(), SubjectServiceError> {
        let name = SubjectName::new(name)?;
        match self.subjects.delete_subject(&name).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(SubjectServiceError::NotFound(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    fn service() -> SubjectService {
        SubjectService::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn user_subjects_join_the_defaults() {
        let service = service();
        service.add_subject("MHO").await.unwrap();
        service.add_subject("Maths").await.unwrap();

        let names = service.subject_names().await.unwrap();
        assert_eq!(
            names,
            vec!["Anglais", "Autre", "Histoire", "Info", "MHO", "Maths", "Physique"]
        );
    }

    #[tokio::test]
    async fn duplicates_and_blanks_are_rejected() {
        let service = service();
        service.add_subject("CGE").await.unwrap();
        assert!(matches!(
            service.add_subject(" CGE ").await,
            Err(SubjectServiceError::AlreadyExists(name)) if name == "CGE"
        ));
        assert!(matches!(
            service.add_subject("   ").await,
            Err(SubjectServiceError::Subject(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_default_keeps_it_listed() {
        let service = service();
        service.add_subject("Info").await.unwrap();
        service.remove_subject("Info").await.unwrap();
        assert!(service.subject_names().await.unwrap().contains(&"Info".to_string()));

        assert!(matches!(
            service.remove_subject("Info").await,
            Err(SubjectServiceError::NotFound(_))
        ));
    }
}
