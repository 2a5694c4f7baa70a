//! Plain-text rendering of topics, exams and agenda days.

use std::fmt::Write as _;

use study_core::agenda::{AgendaDay, DayStatus};
use study_core::model::Topic;
use study_core::urgency::{ExamCountdown, ExamStatus};

#[must_use]
pub fn topic_line(topic: &Topic) -> String {
    let mut line = format!(
        "#{} {} [{}] stage {} next {}",
        topic.id(),
        topic.title(),
        topic.display_subject(),
        topic.stage(),
        topic.next_review()
    );
    if !topic.is_active() {
        line.push_str(" (library)");
    }
    if !topic.flashcards().is_empty() {
        let _ = write!(line, " cards {}", topic.flashcards().len());
    }
    line
}

/// Topic line followed by its links and flashcards.
#[must_use]
pub fn topic_details(topic: &Topic) -> String {
    let mut out = topic_line(topic);
    if let Some(link) = topic.course_link() {
        let _ = write!(out, "\n  course: {link}");
    }
    if let Some(link) = topic.exercise_link() {
        let _ = write!(out, "\n  exercises: {link}");
    }
    for card in topic.flashcards() {
        let _ = write!(out, "\n  card {}: {} -> {}", card.id(), card.question(), card.answer());
    }
    out
}

#[must_use]
pub fn agenda_day(day: &AgendaDay) -> String {
    let label = match day.status {
        DayStatus::Late => "late",
        DayStatus::Today => "today",
        DayStatus::Upcoming => "upcoming",
    };
    let mut out = format!("{} ({label})", day.date);
    for topic in &day.topics {
        let _ = write!(out, "\n  {}", topic_line(topic));
    }
    out
}

#[must_use]
pub fn countdown(countdown: &ExamCountdown) -> String {
    let exam = &countdown.exam;
    let when = match countdown.status {
        ExamStatus::Past => format!("{} days ago", -countdown.days_left),
        ExamStatus::Urgent => format!("J-{} !", countdown.days_left),
        ExamStatus::Upcoming => format!("J-{}", countdown.days_left),
    };
    format!(
        "#{} {} on {} {when} ({} topics)",
        exam.id(),
        exam.title(),
        exam.date(),
        exam.topic_ids().len()
    )
}

#[must_use]
pub fn streak(days: u32) -> String {
    let unit = if days == 1 { "day" } else { "days" };
    format!("streak: {days} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{ExamDraft, ExamId, TopicDraft, TopicId};

    fn topic() -> Topic {
        TopicDraft::active("Ondes")
            .with_subject("Physique")
            .validate("2024-01-01".parse().unwrap())
            .unwrap()
            .assign_id(TopicId::new(3))
    }

    #[test]
    fn topic_line_shows_schedule() {
        assert_eq!(
            topic_line(&topic()),
            "#3 Ondes [Physique] stage 0 next 2024-01-02"
        );
    }

    #[test]
    fn details_list_flashcards() {
        let mut topic = topic();
        topic.add_flashcard("c = ?", "λf").unwrap();
        let details = topic_details(&topic);
        assert!(details.starts_with("#3 Ondes [Physique] stage 0 next 2024-01-02 cards 1"));
        assert!(details.ends_with("card 1: c = ? -> λf"));
    }

    #[test]
    fn urgent_exams_are_flagged() {
        let exam = ExamDraft::new("Partiel", "2024-01-03".parse().unwrap(), vec![TopicId::new(3)])
            .validate()
            .unwrap()
            .assign_id(ExamId::new(1));
        let line = countdown(&ExamCountdown::new(exam, "2024-01-01".parse().unwrap()));
        assert_eq!(line, "#1 Partiel on 2024-01-03 J-2 ! (1 topics)");
    }

    #[test]
    fn streak_is_pluralized() {
        assert_eq!(streak(1), "streak: 1 day");
        assert_eq!(streak(6), "streak: 6 days");
    }
}
