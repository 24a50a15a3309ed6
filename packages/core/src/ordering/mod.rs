//! Ordering Engine
//!
//! Keeps `order` dense and zero-based inside a sibling group: after any
//! operation the ranks of a group of `n` members are exactly `0..n`.
//!
//! All functions here are pure. They take the group's current members,
//! compute the target arrangement, and return only the [`RankChange`]s whose
//! rank actually differs, so callers can turn them into a minimal set of
//! patches for one batch.
//!
//! Members are compared by `(order, id)`; the id tie-break makes the result
//! deterministic even if a stale write left duplicate ranks behind.

use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Task, TaskList};

/// Anything that carries an id and a sibling rank
pub trait Ranked {
    fn rank_id(&self) -> &str;
    fn rank(&self) -> i64;
}

impl Ranked for Task {
    fn rank_id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> i64 {
        self.order
    }
}

impl Ranked for TaskList {
    fn rank_id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> i64 {
        self.order
    }
}

/// New rank for one member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankChange {
    pub id: String,
    pub order: i64,
}

impl RankChange {
    fn new(id: impl Into<String>, order: usize) -> Self {
        Self {
            id: id.into(),
            order: order as i64,
        }
    }
}

/// Why a caller-supplied arrangement is not a permutation of the group
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrangementError {
    #[error("id '{0}' is not a member of the sibling group")]
    UnknownId(String),

    #[error("id '{0}' appears more than once")]
    DuplicateId(String),

    #[error("member '{0}' is missing from the arrangement")]
    MissingId(String),
}

/// Rank of a member appended to a group that currently has `count` members
pub fn append_rank(count: usize) -> i64 {
    count as i64
}

/// Members sorted by current rank, ties broken by id
pub fn sorted_by_rank<T: Ranked>(members: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = members.iter().collect();
    sorted.sort_by(|a, b| {
        a.rank()
            .cmp(&b.rank())
            .then_with(|| a.rank_id().cmp(b.rank_id()))
    });
    sorted
}

/// Reorder: every id gets its index in `ordered_ids`
///
/// No membership check is done here; see [`validate_arrangement`]. Ids whose
/// current rank already equals their index are left out when the member is
/// known.
pub fn reorder<T: Ranked>(members: &[T], ordered_ids: &[String]) -> Vec<RankChange> {
    ordered_ids
        .iter()
        .enumerate()
        .filter(|(index, id)| {
            members
                .iter()
                .find(|member| member.rank_id() == id.as_str())
                .map_or(true, |member| member.rank() != *index as i64)
        })
        .map(|(index, id)| RankChange::new(id.as_str(), index))
        .collect()
}

/// Removal: close the gap left by members no longer in the group
///
/// `remaining` are the members still present, with their current ranks.
pub fn close_gap<T: Ranked>(remaining: &[T]) -> Vec<RankChange> {
    sorted_by_rank(remaining)
        .into_iter()
        .enumerate()
        .filter(|(index, member)| member.rank() != *index as i64)
        .map(|(index, member)| RankChange::new(member.rank_id(), index))
        .collect()
}

/// Insertion at position: splice `moving_id` into `others` at `index`
///
/// `others` must not contain the moving member. `index` is clamped to
/// `[0, others.len()]`; `None` appends. The moving member's change is always
/// included since its previous rank belonged to another group or slot.
pub fn insert_at<T: Ranked>(others: &[T], moving_id: &str, index: Option<usize>) -> Vec<RankChange> {
    let sorted = sorted_by_rank(others);
    let slot = index.unwrap_or(sorted.len()).min(sorted.len());

    let mut changes = Vec::new();
    let mut rank = 0usize;
    for (position, member) in sorted.iter().enumerate() {
        if position == slot {
            changes.push(RankChange::new(moving_id, rank));
            rank += 1;
        }
        if member.rank() != rank as i64 {
            changes.push(RankChange::new(member.rank_id(), rank));
        }
        rank += 1;
    }
    if slot == sorted.len() {
        changes.push(RankChange::new(moving_id, rank));
    }
    changes
}

/// Check that `ordered_ids` is exactly a permutation of the members' ids
pub fn validate_arrangement<T: Ranked>(
    members: &[T],
    ordered_ids: &[String],
) -> Result<(), ArrangementError> {
    let member_ids: HashSet<&str> = members.iter().map(Ranked::rank_id).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(ordered_ids.len());

    for id in ordered_ids {
        if !member_ids.contains(id.as_str()) {
            return Err(ArrangementError::UnknownId(id.clone()));
        }
        if !seen.insert(id.as_str()) {
            return Err(ArrangementError::DuplicateId(id.clone()));
        }
    }

    if let Some(missing) = sorted_by_rank(members)
        .into_iter()
        .find(|member| !seen.contains(member.rank_id()))
    {
        return Err(ArrangementError::MissingId(missing.rank_id().to_string()));
    }

    Ok(())
}

/// Whether the members' ranks are exactly `0..n`
pub fn is_dense<T: Ranked>(members: &[T]) -> bool {
    sorted_by_rank(members)
        .into_iter()
        .enumerate()
        .all(|(index, member)| member.rank() == index as i64)
}
