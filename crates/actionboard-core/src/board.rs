use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{
  DateTime,
  TimeZone
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info
};

use crate::payload::Action;
use crate::selection::Criteria;

/// Ordered display names; an entry's
/// position is the index actions refer
/// to.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct NameTable {
  names: Vec<String>
}

impl NameTable {
  pub fn new(names: Vec<String>) -> Self {
    Self {
      names
    }
  }

  pub fn index_of(
    &self,
    name: &str
  ) -> Option<usize> {
    self
      .names
      .iter()
      .position(|n| n == name)
  }

  pub fn get(
    &self,
    index: usize
  ) -> Option<&str> {
    self
      .names
      .get(index)
      .map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }

  /// Maps display names to indices.
  /// Names missing from the table are
  /// dropped, so they can never match an
  /// action.
  pub fn resolve<'a, I>(
    &self,
    names: I
  ) -> BTreeSet<usize>
  where
    I: IntoIterator<Item = &'a str>
  {
    names
      .into_iter()
      .filter_map(|name| {
        let idx = self.index_of(name);
        if idx.is_none() {
          debug!(
            name,
            "name not present in table; it matches nothing"
          );
        }
        idx
      })
      .collect()
  }
}

/// The dashboard's data: both lookup
/// tables and the action list, loaded
/// once and read-only afterwards.
///
/// Wire form is the triple
/// `[contexts, people, actions]`, with
/// actions already sorted by deadline.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(
  from = "RawBoard",
  into = "RawBoard"
)]
pub struct Board {
  contexts: NameTable,
  people:   NameTable,
  actions:  Vec<Action>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
struct RawBoard(
  NameTable,
  NameTable,
  Vec<Action>
);

impl From<RawBoard> for Board {
  fn from(
    RawBoard(contexts, people, actions): RawBoard
  ) -> Self {
    Self {
      contexts,
      people,
      actions
    }
  }
}

impl From<Board> for RawBoard {
  fn from(board: Board) -> Self {
    RawBoard(
      board.contexts,
      board.people,
      board.actions
    )
  }
}

impl Board {
  pub fn new(
    contexts: Vec<String>,
    people: Vec<String>,
    actions: Vec<Action>
  ) -> Self {
    Self {
      contexts: NameTable::new(
        contexts
      ),
      people: NameTable::new(people),
      actions
    }
  }

  #[tracing::instrument(skip(raw))]
  pub fn from_json(
    raw: &str
  ) -> anyhow::Result<Self> {
    let board: Self =
      serde_json::from_str(raw.trim())
        .context(
          "failed to decode actions \
           payload"
        )?;
    debug!(
      contexts = board.contexts.len(),
      people = board.people.len(),
      actions = board.actions.len(),
      "decoded actions payload"
    );
    Ok(board)
  }

  #[tracing::instrument(skip(path), fields(path = %path.display()))]
  pub fn load(
    path: &Path
  ) -> anyhow::Result<Self> {
    let raw = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let board = Self::from_json(&raw)
      .with_context(|| {
        format!(
          "failed to load board from \
           {}",
          path.display()
        )
      })?;
    info!(
      path = %path.display(),
      actions = board.actions.len(),
      "loaded board"
    );
    Ok(board)
  }

  pub fn contexts(&self) -> &NameTable {
    &self.contexts
  }

  pub fn people(&self) -> &NameTable {
    &self.people
  }

  pub fn actions(&self) -> &[Action] {
    &self.actions
  }

  /// See [`crate::urgent::urgent_items`].
  pub fn urgent<Z: TimeZone>(
    &self,
    reference: &DateTime<Z>,
    proximity_days: u32
  ) -> Vec<String> {
    crate::urgent::urgent_items(
      self,
      reference,
      proximity_days
    )
  }

  /// See [`crate::filter::filter_actions`].
  pub fn filter<Z: TimeZone>(
    &self,
    reference: &DateTime<Z>,
    criteria: &Criteria
  ) -> anyhow::Result<Vec<String>> {
    crate::filter::filter_actions(
      self, reference, criteria
    )
  }
}
