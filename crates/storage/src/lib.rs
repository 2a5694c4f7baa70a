#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AuthSession, ExamRepository, InMemoryRepository, ProfileRepository, StaticSession, Storage,
    StorageError, SubjectRepository, TopicFilter, TopicRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
