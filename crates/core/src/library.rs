use crate::model::Topic;

/// Subject selector value meaning "every subject".
pub const ALL_SUBJECTS: &str = "Tout";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubjectFilter {
    #[default]
    All,
    Named(String),
}

impl SubjectFilter {
    /// Parse a selector value; `Tout` and blank mean all subjects.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == ALL_SUBJECTS {
            SubjectFilter::All
        } else {
            SubjectFilter::Named(trimmed.to_owned())
        }
    }
}

/// Library search: subject selector plus a case-insensitive title search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryFilter {
    pub subject: SubjectFilter,
    pub search: String,
}

impl LibraryFilter {
    #[must_use]
    pub fn new(subject: SubjectFilter, search: impl Into<String>) -> Self {
        Self {
            subject,
            search: search.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, topic: &Topic) -> bool {
        let subject_ok = match &self.subject {
            SubjectFilter::All => true,
            SubjectFilter::Named(name) => topic.display_subject() == name,
        };
        subject_ok && topic.title().to_lowercase().contains(&self.search.to_lowercase())
    }

    #[must_use]
    pub fn apply<'a>(&self, topics: &'a [Topic]) -> Vec<&'a Topic> {
        topics.iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::StudyDate;
    use crate::model::{TopicDraft, TopicId};

    fn topic(id: u64, title: &str, subject: Option<&str>) -> Topic {
        let mut draft = TopicDraft::library(title);
        if let Some(subject) = subject {
            draft = draft.with_subject(subject);
        }
        draft
            .validate(StudyDate::from_ymd(2024, 1, 1).unwrap())
            .unwrap()
            .assign_id(TopicId::new(id))
    }

    fn ids(topics: &[&Topic]) -> Vec<u64> {
        topics.iter().map(|t| t.id().value()).collect()
    }

    #[test]
    fn default_filter_matches_everything() {
        let topics = vec![topic(1, "Intégrales", Some("Maths")), topic(2, "Optique", None)];
        assert_eq!(ids(&LibraryFilter::default().apply(&topics)), vec![1, 2]);
    }

    #[test]
    fn subject_filter_treats_missing_subject_as_fallback() {
        let topics = vec![topic(1, "Intégrales", Some("Maths")), topic(2, "Optique", None)];
        let filter = LibraryFilter::new(SubjectFilter::parse("Autre"), "");
        assert_eq!(ids(&filter.apply(&topics)), vec![2]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let topics = vec![
            topic(1, "Intégrales doubles", Some("Maths")),
            topic(2, "Séries entières", Some("Maths")),
            topic(3, "INTÉGRALES curvilignes", Some("Physique")),
        ];
        let filter = LibraryFilter::new(SubjectFilter::All, "intégrales");
        assert_eq!(ids(&filter.apply(&topics)), vec![1, 3]);

        let filter = LibraryFilter::new(SubjectFilter::parse("Maths"), "INTÉ");
        assert_eq!(ids(&filter.apply(&topics)), vec![1]);
    }

    #[test]
    fn tout_selects_all_subjects() {
        assert_eq!(SubjectFilter::parse("Tout"), SubjectFilter::All);
        assert_eq!(SubjectFilter::parse(""), SubjectFilter::All);
        assert_eq!(SubjectFilter::parse(" Info "), SubjectFilter::Named("Info".into()));
    }
}
