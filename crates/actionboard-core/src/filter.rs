use std::collections::BTreeSet;

use chrono::{
  DateTime,
  TimeZone
};
use tracing::{
  debug,
  trace
};

use crate::board::{
  Board,
  NameTable
};
use crate::budget::parse_time_spec;
use crate::datetime::start_of_day;
use crate::payload::Action;
use crate::selection::{
  Criteria,
  TypeTag
};

/// [`Criteria`] with names resolved
/// against a board's tables and the time
/// budget parsed.
#[derive(Debug, Clone)]
pub struct CompiledCriteria {
  contexts:  Option<BTreeSet<usize>>,
  people:    Option<BTreeSet<usize>>,
  max_time:  Option<u32>,
  max_focus: Option<u8>,
  kind:      TypeTag
}

impl CompiledCriteria {
  #[tracing::instrument(skip(board))]
  pub fn compile(
    board: &Board,
    criteria: &Criteria
  ) -> anyhow::Result<Self> {
    let max_time = match &criteria.max_time
    {
      | Some(spec) => {
        parse_time_spec(spec)?
      }
      | None => None
    };

    Ok(Self {
      contexts: resolve_names(
        board.contexts(),
        criteria.contexts.as_deref()
      ),
      people: resolve_names(
        board.people(),
        criteria.people.as_deref()
      ),
      max_time,
      max_focus: criteria.max_focus,
      kind: criteria.kind
    })
  }

  /// Every predicate except the
  /// schedule gate.
  pub fn matches(
    &self,
    action: &Action
  ) -> bool {
    if !self.kind.admits(action.keyword)
    {
      return false;
    }

    if let Some(wanted) = &self.contexts
      && !covered_by(
        &action.contexts,
        wanted
      )
    {
      return false;
    }

    if let Some(wanted) = &self.people
      && !covered_by(
        &action.people,
        wanted
      )
    {
      return false;
    }

    if let Some(limit) = self.max_time
      && action
        .time
        .is_some_and(|t| t > limit)
    {
      return false;
    }

    if let Some(ceiling) = self.max_focus
      && action.focus > ceiling
    {
      return false;
    }

    true
  }
}

fn resolve_names(
  table: &NameTable,
  names: Option<&[String]>
) -> Option<BTreeSet<usize>> {
  names.map(|names| {
    table.resolve(
      names.iter().map(String::as_str)
    )
  })
}

/// The action needs at least one entry
/// and every entry must be available.
fn covered_by(
  needed: &BTreeSet<usize>,
  available: &BTreeSet<usize>
) -> bool {
  !needed.is_empty()
    && needed.is_subset(available)
}

/// Actions matching `criteria`, with
/// phrases substituted, in board order.
///
/// The schedule gate compares against
/// `reference` as given, time of day
/// included, while the phrases are
/// measured from that day's local
/// midnight.
#[tracing::instrument(skip(board, reference))]
pub fn filter_actions<Z: TimeZone>(
  board: &Board,
  reference: &DateTime<Z>,
  criteria: &Criteria
) -> anyhow::Result<Vec<String>> {
  let compiled = CompiledCriteria::compile(
    board, criteria
  )?;
  debug!(?compiled, "compiled criteria");

  let phrase_reference =
    start_of_day(reference);

  let mut filtered = Vec::new();
  for (idx, action) in
    board.actions().iter().enumerate()
  {
    let ok = compiled.matches(action)
      && !action.scheduled_after(reference);
    trace!(idx, keyword = ?action.keyword, ok, "filter predicate evaluation");
    if ok {
      filtered.push(
        crate::render::substitute_phrases(
          action,
          &phrase_reference
        )
      );
    }
  }

  Ok(filtered)
}
