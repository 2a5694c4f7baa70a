use std::collections::BTreeMap;

use crate::date::StudyDate;
use crate::model::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    /// Review day already passed.
    Late,
    Today,
    Upcoming,
}

impl DayStatus {
    #[must_use]
    pub fn classify(date: StudyDate, today: StudyDate) -> Self {
        match date.cmp(&today) {
            std::cmp::Ordering::Less => DayStatus::Late,
            std::cmp::Ordering::Equal => DayStatus::Today,
            std::cmp::Ordering::Greater => DayStatus::Upcoming,
        }
    }
}

/// Topics sharing one review day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaDay {
    pub date: StudyDate,
    pub status: DayStatus,
    pub topics: Vec<Topic>,
}

/// Group topics by review day, earliest day first. Within a day topics keep
/// their input order.
#[must_use]
pub fn build_agenda(topics: impl IntoIterator<Item = Topic>, today: StudyDate) -> Vec<AgendaDay> {
    let mut by_day: BTreeMap<StudyDate, Vec<Topic>> = BTreeMap::new();
    for topic in topics {
        by_day.entry(topic.next_review()).or_default().push(topic);
    }

    by_day
        .into_iter()
        .map(|(date, topics)| AgendaDay {
            date,
            status: DayStatus::classify(date, today),
            topics,
        })
        .collect()
}

/// Topics due on or before `today`, input order preserved.
#[must_use]
pub fn due_topics(topics: &[Topic], today: StudyDate) -> Vec<&Topic> {
    topics.iter().filter(|t| t.is_due(today)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TopicDraft, TopicId};
    use crate::scheduler::{Schedule, Stage};

    fn d(s: &str) -> StudyDate {
        s.parse().unwrap()
    }

    fn topic(id: u64, next_review: &str) -> Topic {
        let mut t = TopicDraft::active(format!("T{id}"))
            .validate(d("2023-12-01"))
            .unwrap()
            .assign_id(TopicId::new(id));
        t.apply_schedule(&Schedule {
            stage: Stage::INITIAL,
            next_review: d(next_review),
            offset_days: 0,
        });
        t
    }

    #[test]
    fn groups_by_day_in_calendar_order() {
        let topics = vec![
            topic(1, "2024-01-03"),
            topic(2, "2023-12-30"),
            topic(3, "2024-01-01"),
            topic(4, "2024-01-03"),
        ];

        let agenda = build_agenda(topics, d("2024-01-01"));

        let days: Vec<(String, DayStatus, Vec<u64>)> = agenda
            .iter()
            .map(|day| {
                (
                    day.date.to_string(),
                    day.status,
                    day.topics.iter().map(|t| t.id().value()).collect(),
                )
            })
            .collect();
        assert_eq!(
            days,
            vec![
                ("2023-12-30".to_string(), DayStatus::Late, vec![2]),
                ("2024-01-01".to_string(), DayStatus::Today, vec![3]),
                ("2024-01-03".to_string(), DayStatus::Upcoming, vec![1, 4]),
            ]
        );
    }

    #[test]
    fn empty_input_gives_empty_agenda() {
        assert!(build_agenda(Vec::new(), d("2024-01-01")).is_empty());
    }

    #[test]
    fn due_topics_include_late_and_today() {
        let topics = vec![topic(1, "2024-01-02"), topic(2, "2023-12-31"), topic(3, "2024-01-01")];
        let due: Vec<u64> = due_topics(&topics, d("2024-01-01"))
            .iter()
            .map(|t| t.id().value())
            .collect();
        assert_eq!(due, vec![2, 3]);
    }
}
