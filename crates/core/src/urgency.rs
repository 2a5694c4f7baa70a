use crate::date::StudyDate;
use crate::model::Exam;

/// An exam this many days away or closer counts as urgent.
pub const URGENT_WITHIN_DAYS: i64 = 3;

/// A topic is due once its review day is today or earlier.
#[must_use]
pub fn is_due(next_review: StudyDate, today: StudyDate) -> bool {
    next_review <= today
}

/// Whole days from `today` until `date`; negative once the date has passed.
#[must_use]
pub fn days_left(date: StudyDate, today: StudyDate) -> i64 {
    today.days_until(date)
}

#[must_use]
pub fn is_urgent(days_left: i64) -> bool {
    days_left <= URGENT_WITHIN_DAYS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamStatus {
    Past,
    Urgent,
    Upcoming,
}

impl ExamStatus {
    #[must_use]
    pub fn classify(days_left: i64) -> Self {
        if days_left < 0 {
            ExamStatus::Past
        } else if is_urgent(days_left) {
            ExamStatus::Urgent
        } else {
            ExamStatus::Upcoming
        }
    }
}

/// An exam together with its countdown relative to a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamCountdown {
    pub exam: Exam,
    pub days_left: i64,
    pub status: ExamStatus,
}

impl ExamCountdown {
    #[must_use]
    pub fn new(exam: Exam, today: StudyDate) -> Self {
        let days_left = days_left(exam.date(), today);
        Self {
            exam,
            days_left,
            status: ExamStatus::classify(days_left),
        }
    }

    #[must_use]
    pub fn is_urgent(&self) -> bool {
        self.status == ExamStatus::Urgent
    }
}

/// Exams split into two disjoint views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamPartition {
    /// `date >= today`, soonest first.
    pub upcoming: Vec<ExamCountdown>,
    /// `date < today`, most recent first.
    pub past: Vec<ExamCountdown>,
}

/// Partition exams around `today`. Equal dates keep their input order.
#[must_use]
pub fn partition_exams(exams: impl IntoIterator<Item = Exam>, today: StudyDate) -> ExamPartition {
    let (mut upcoming, mut past): (Vec<_>, Vec<_>) = exams
        .into_iter()
        .map(|exam| ExamCountdown::new(exam, today))
        .partition(|c| c.days_left >= 0);

    upcoming.sort_by_key(|c| c.exam.date());
    past.sort_by(|a, b| b.exam.date().cmp(&a.exam.date()));

    ExamPartition { upcoming, past }
}
