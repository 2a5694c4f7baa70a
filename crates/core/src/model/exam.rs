use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date::StudyDate;
use crate::model::ids::{ExamId, TopicId};
use crate::urgency;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,
}

/// Unvalidated input for a new exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDraft {
    pub title: String,
    pub date: StudyDate,
    pub topic_ids: Vec<TopicId>,
}

impl ExamDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, date: StudyDate, topic_ids: Vec<TopicId>) -> Self {
        Self {
            title: title.into(),
            date,
            topic_ids,
        }
    }

    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` for a blank title.
    pub fn validate(self) -> Result<NewExam, ExamError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        Ok(NewExam {
            title: title.to_owned(),
            date: self.date,
            topic_ids: dedup_ids(self.topic_ids),
        })
    }
}

/// Validated exam waiting for a storage-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExam {
    pub title: String,
    pub date: StudyDate,
    pub topic_ids: Vec<TopicId>,
}

impl NewExam {
    #[must_use]
    pub fn assign_id(self, id: ExamId) -> Exam {
        Exam {
            id,
            title: self.title,
            date: self.date,
            topic_ids: self.topic_ids,
        }
    }
}

/// A dated exam covering a set of topics.
///
/// Topic ids are references, not owned copies; a referenced topic may no
/// longer exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    id: ExamId,
    title: String,
    date: StudyDate,
    topic_ids: Vec<TopicId>,
}

impl Exam {
    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` if the stored title is blank.
    pub fn from_persisted(
        id: ExamId,
        title: String,
        date: StudyDate,
        topic_ids: Vec<TopicId>,
    ) -> Result<Self, ExamError> {
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            date,
            topic_ids: dedup_ids(topic_ids),
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn date(&self) -> StudyDate {
        self.date
    }

    #[must_use]
    pub fn topic_ids(&self) -> &[TopicId] {
        &self.topic_ids
    }

    #[must_use]
    pub fn covers(&self, topic: TopicId) -> bool {
        self.topic_ids.contains(&topic)
    }

    #[must_use]
    pub fn days_left(&self, today: StudyDate) -> i64 {
        urgency::days_left(self.date, today)
    }

    /// Returns true if the topic was referenced.
    pub fn detach_topic(&mut self, topic: TopicId) -> bool {
        let before = self.topic_ids.len();
        self.topic_ids.retain(|id| *id != topic);
        self.topic_ids.len() != before
    }
}

fn dedup_ids(ids: Vec<TopicId>) -> Vec<TopicId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> StudyDate {
        s.parse().unwrap()
    }

    #[test]
    fn topic_ids_are_deduplicated_in_order() {
        let ids = [3, 1, 3, 2, 1].map(TopicId::new).to_vec();
        let exam = ExamDraft::new("Partiel", d("2024-01-20"), ids)
            .validate()
            .unwrap()
            .assign_id(ExamId::new(1));
        assert_eq!(exam.topic_ids(), &[3, 1, 2].map(TopicId::new));
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = ExamDraft::new(" ", d("2024-01-20"), vec![]).validate().unwrap_err();
        assert_eq!(err, ExamError::EmptyTitle);
    }

    #[test]
    fn detach_removes_only_that_topic() {
        let mut exam = ExamDraft::new("Méca", d("2024-01-20"), [1, 2].map(TopicId::new).to_vec())
            .validate()
            .unwrap()
            .assign_id(ExamId::new(1));
        assert!(exam.detach_topic(TopicId::new(1)));
        assert!(!exam.detach_topic(TopicId::new(1)));
        assert_eq!(exam.topic_ids(), &[TopicId::new(2)]);
        assert!(exam.covers(TopicId::new(2)));
    }

    #[test]
    fn countdown_from_today() {
        let exam = ExamDraft::new("Élec", d("2024-01-04"), vec![])
            .validate()
            .unwrap()
            .assign_id(ExamId::new(9));
        assert_eq!(exam.days_left(d("2024-01-01")), 3);
        assert_eq!(exam.days_left(d("2024-01-06")), -2);
    }
}
