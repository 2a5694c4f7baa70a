mod exam;
mod flashcard;
mod ids;
mod profile;
mod subject;
mod topic;

pub use ids::{ExamId, FlashcardId, ParseIdError, SubjectId, TopicId, UserId};

pub use exam::{Exam, ExamDraft, ExamError, NewExam};
pub use flashcard::{Flashcard, FlashcardError};
pub use profile::{Profile, ProfileError};
pub use subject::{DEFAULT_SUBJECTS, Subject, SubjectError, SubjectName, merge_subjects};
pub use topic::{
    ACTIVE_TOPIC_OFFSET_DAYS, FALLBACK_SUBJECT, LIBRARY_TOPIC_OFFSET_DAYS, NewTopic, Topic,
    TopicDraft, TopicEdit, TopicError,
};
