//! Tag service.

use std::collections::HashMap;

use qanda_common::{AppError, AppResult, Config};
use qanda_db::{
    entities::tag,
    repositories::{TagRepository, TagUsage},
};
use sea_orm::ConnectionTrait;

/// Maximum length of a single tag name.
const MAX_TAG_LENGTH: usize = 30;

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    max_tags: usize,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub fn new(tag_repo: TagRepository, config: &Config) -> Self {
        Self {
            tag_repo,
            max_tags: config.site.max_tags,
        }
    }

    /// Parse a comma-separated tag list.
    ///
    /// Names are trimmed and lowercased; empty entries and repeats are dropped.
    /// More than `max` non-empty entries is an error even if some repeat.
    pub fn parse_tag_list(raw: &str, max: usize) -> AppResult<Vec<String>> {
        let entries: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
            .collect();

        if entries.len() > max {
            return Err(AppError::Validation(format!("Max {max} tags is allowed")));
        }

        let mut names: Vec<String> = Vec::with_capacity(entries.len());
        for name in entries {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if let Some(long) = names.iter().find(|n| n.chars().count() > MAX_TAG_LENGTH) {
            return Err(AppError::Validation(format!(
                "Tag \"{long}\" is longer than {MAX_TAG_LENGTH} characters"
            )));
        }

        Ok(names)
    }

    /// Parse a tag list against the configured limit.
    pub fn parse(&self, raw: &str) -> AppResult<Vec<String>> {
        Self::parse_tag_list(raw, self.max_tags)
    }

    /// Get or create tags by name.
    pub async fn get_or_create<C>(&self, conn: &C, names: &[String]) -> AppResult<Vec<tag::Model>>
    where
        C: ConnectionTrait,
    {
        self.tag_repo.get_or_create(conn, names).await
    }

    /// Attach tags to a question.
    pub async fn attach<C>(&self, conn: &C, question_id: &str, tags: &[tag::Model]) -> AppResult<()>
    where
        C: ConnectionTrait,
    {
        let ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        self.tag_repo.link(conn, question_id, &ids).await
    }

    /// Tag names of each question.
    pub async fn names_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<String>>> {
        let tags = self.tag_repo.find_by_questions(question_ids).await?;
        Ok(tags
            .into_iter()
            .map(|(question_id, tags)| (question_id, tags.into_iter().map(|t| t.name).collect()))
            .collect())
    }

    /// Most used tags.
    pub async fn list_popular(&self, limit: u64) -> AppResult<Vec<TagUsage>> {
        self.tag_repo.find_popular(limit).await
    }
}
