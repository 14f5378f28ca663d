//! Vote service.
//!
//! Users cast up/down votes on questions and answers. Each (user, entity)
//! pair holds at most one vote; casting the same direction again withdraws
//! it, casting the opposite direction flips it. After every change the
//! entity's `rank` is re-derived from the ledger inside the same transaction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use qanda_common::{AppError, AppResult, IdGenerator};
use qanda_db::{
    Votable,
    entities::{answer, question, vote, vote::VotableKind},
    repositories::VoteRepository,
};
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Direction of a single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Ledger value of this direction.
    #[must_use]
    pub const fn value(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Direction of a stored ledger value.
    #[must_use]
    pub const fn of_value(value: i16) -> Self {
        if value > 0 { Self::Up } else { Self::Down }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(AppError::InvalidVoteValue(other.to_string())),
        }
    }
}

impl FromStr for VoteDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(AppError::InvalidVoteValue(other.to_string())),
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// A user's standing vote on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    None,
    Up,
    Down,
}

impl From<Option<VoteDirection>> for VoteState {
    fn from(direction: Option<VoteDirection>) -> Self {
        match direction {
            None => Self::None,
            Some(VoteDirection::Up) => Self::Up,
            Some(VoteDirection::Down) => Self::Down,
        }
    }
}

/// What a cast does to the ledger, given the vote already standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior vote: record one.
    Insert(VoteDirection),
    /// Same direction again: withdraw the prior vote.
    Remove,
    /// Opposite direction: overwrite the prior vote.
    Flip(VoteDirection),
}

impl VoteTransition {
    /// Decide the ledger change for casting `cast` over `existing`.
    #[must_use]
    pub fn decide(existing: Option<VoteDirection>, cast: VoteDirection) -> Self {
        match existing {
            None => Self::Insert(cast),
            Some(prior) if prior == cast => Self::Remove,
            Some(_) => Self::Flip(cast),
        }
    }

    /// The user's vote state once this transition is applied.
    #[must_use]
    pub const fn resulting_state(self) -> VoteState {
        match self {
            Self::Insert(VoteDirection::Up) | Self::Flip(VoteDirection::Up) => VoteState::Up,
            Self::Insert(VoteDirection::Down) | Self::Flip(VoteDirection::Down) => VoteState::Down,
            Self::Remove => VoteState::None,
        }
    }
}

/// Result of a cast: the caller's new vote state and the entity's new rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub state: VoteState,
    pub rank: i32,
}

/// A user's standing votes, keyed by entity ID within each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserVotes {
    pub question: BTreeMap<String, i16>,
    pub answer: BTreeMap<String, i16>,
}

impl UserVotes {
    /// Standing vote on one entity, if any.
    #[must_use]
    pub fn get(&self, kind: VotableKind, entity_id: &str) -> Option<VoteDirection> {
        let votes = match kind {
            VotableKind::Question => &self.question,
            VotableKind::Answer => &self.answer,
        };
        votes.get(entity_id).copied().map(VoteDirection::of_value)
    }
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository) -> Self {
        Self {
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote from raw request values.
    ///
    /// `value` must be `1` or `-1` and `entity_type` must name a votable kind;
    /// both are checked before the database is touched.
    pub async fn cast_vote(
        &self,
        user_id: &str,
        entity_type: &str,
        entity_id: &str,
        value: i64,
    ) -> AppResult<VoteOutcome> {
        let direction = VoteDirection::try_from(value)?;
        let kind: VotableKind = entity_type.parse()?;
        self.cast(user_id, kind, entity_id, direction).await
    }

    /// Cast a vote on an entity of a known kind.
    pub async fn cast(
        &self,
        user_id: &str,
        kind: VotableKind,
        entity_id: &str,
        direction: VoteDirection,
    ) -> AppResult<VoteOutcome> {
        match kind {
            VotableKind::Question => {
                self.cast_on::<question::Model>(user_id, entity_id, direction)
                    .await
            }
            VotableKind::Answer => {
                self.cast_on::<answer::Model>(user_id, entity_id, direction)
                    .await
            }
        }
    }

    /// Re-derive an entity's rank from the ledger and store it.
    ///
    /// Returns `None` when no such entity exists.
    pub async fn recompute_rank(
        &self,
        kind: VotableKind,
        entity_id: &str,
    ) -> AppResult<Option<i32>> {
        match kind {
            VotableKind::Question => self.recompute_on::<question::Model>(entity_id).await,
            VotableKind::Answer => self.recompute_on::<answer::Model>(entity_id).await,
        }
    }

    /// All standing votes of a user, grouped by kind.
    pub async fn user_votes(&self, user_id: &str) -> AppResult<UserVotes> {
        let votes = self.vote_repo.find_by_user(user_id).await?;

        let mut grouped = UserVotes::default();
        for vote in votes {
            let bucket = match vote.entity_type {
                VotableKind::Question => &mut grouped.question,
                VotableKind::Answer => &mut grouped.answer,
            };
            bucket.insert(vote.entity_id, vote.value);
        }
        Ok(grouped)
    }

    async fn cast_on<V: Votable>(
        &self,
        user_id: &str,
        entity_id: &str,
        direction: VoteDirection,
    ) -> AppResult<VoteOutcome> {
        let txn = self.vote_repo.begin().await?;

        // Locking the entity first serialises every cast on it.
        let mut entity = V::find_for_update(&txn, entity_id)
            .await?
            .ok_or_else(|| AppError::EntityNotFound {
                kind: V::KIND.to_string(),
                id: entity_id.to_string(),
            })?;

        let existing = self
            .vote_repo
            .find_by_user_and_entity(&txn, user_id, V::KIND, entity_id)
            .await?;

        let prior = existing
            .as_ref()
            .map(|vote| VoteDirection::of_value(vote.value));
        let transition = VoteTransition::decide(prior, direction);

        match (transition, existing) {
            (VoteTransition::Insert(direction), _) => {
                let model = vote::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    entity_type: Set(V::KIND),
                    entity_id: Set(entity_id.to_string()),
                    value: Set(direction.value()),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                };
                self.vote_repo.insert(&txn, model).await?;
            }
            (VoteTransition::Remove, Some(vote)) => {
                self.vote_repo.delete(&txn, &vote.id).await?;
            }
            (VoteTransition::Flip(direction), Some(vote)) => {
                self.vote_repo
                    .set_value(&txn, vote, direction.value())
                    .await?;
            }
            (VoteTransition::Remove | VoteTransition::Flip(_), None) => {
                return Err(AppError::Internal(
                    "vote transition without a prior vote".to_string(),
                ));
            }
        }

        let rank = self.store_rank(&txn, &mut entity).await?;
        txn.commit().await?;

        debug!(
            user_id = %user_id,
            kind = %V::KIND,
            entity_id = %entity_id,
            ?transition,
            rank,
            "Vote cast"
        );

        Ok(VoteOutcome {
            state: transition.resulting_state(),
            rank,
        })
    }

    async fn recompute_on<V: Votable>(&self, entity_id: &str) -> AppResult<Option<i32>> {
        let txn = self.vote_repo.begin().await?;

        let Some(mut entity) = V::find_for_update(&txn, entity_id).await? else {
            return Ok(None);
        };

        let rank = self.store_rank(&txn, &mut entity).await?;
        txn.commit().await?;

        debug!(kind = %V::KIND, entity_id = %entity_id, rank, "Rank recomputed");
        Ok(Some(rank))
    }

    /// Sum the ledger for `entity` and write it onto its rank.
    ///
    /// A row that disappeared between the lock and the write is skipped;
    /// the computed rank is still returned.
    async fn store_rank<V, C>(&self, conn: &C, entity: &mut V) -> AppResult<i32>
    where
        V: Votable,
        C: ConnectionTrait,
    {
        let sum = self
            .vote_repo
            .sum_for_entity(conn, V::KIND, entity.votable_id())
            .await?;
        let rank = i32::try_from(sum)
            .map_err(|_| AppError::Internal(format!("rank out of range: {sum}")))?;

        entity.set_rank(rank);
        if !entity.persist(conn).await? {
            warn!(
                kind = %V::KIND,
                entity_id = %entity.votable_id(),
                rank,
                "Votable row vanished before rank write"
            );
        }
        Ok(rank)
    }
}
