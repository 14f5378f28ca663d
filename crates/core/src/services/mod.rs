//! Business logic services.

#![allow(missing_docs)]

pub mod answer;
pub mod question;
pub mod tag;
pub mod user;
pub mod vote;

#[cfg(test)]
pub(crate) mod test_support;

pub use answer::{AnswerService, CreateAnswerInput};
pub use question::{
    CreateQuestionInput, QuestionDetail, QuestionListItem, QuestionSearch, QuestionService,
};
pub use qanda_db::repositories::{QuestionOrder, TagUsage};
pub use tag::TagService;
pub use user::{RegisterUserInput, UpdateProfileInput, UserService};
pub use vote::{UserVotes, VoteDirection, VoteOutcome, VoteService, VoteState, VoteTransition};
