#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod exam_service;
pub mod review_service;
pub mod streak_service;
pub mod subject_service;
pub mod topic_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, ExamServiceError, ReviewServiceError, StreakServiceError,
    SubjectServiceError, TopicServiceError,
};
pub use exam_service::ExamService;
pub use review_service::{PersistStatus, ReviewReceipt, ReviewService};
pub use streak_service::{StreakCheck, StreakService};
pub use subject_service::SubjectService;
pub use topic_service::{DeletedTopic, TopicService};
