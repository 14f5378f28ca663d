//! Repository layer for database operations.

mod answer;
mod question;
mod tag;
mod user;
mod vote;

pub use answer::AnswerRepository;
pub use question::{QuestionOrder, QuestionRepository};
pub use tag::{TagRepository, TagUsage};
pub use user::UserRepository;
pub use vote::VoteRepository;
