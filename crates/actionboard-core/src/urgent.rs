use chrono::{
  DateTime,
  TimeZone
};
use tracing::{
  debug,
  trace
};

use crate::board::Board;
use crate::datetime::{
  end_of_day_after,
  start_of_day
};
use crate::render::substitute_phrases;

/// Actions whose deadline falls on or
/// before the end of the day
/// `proximity_days` after `reference`,
/// skipping those scheduled after the
/// reference day began.
///
/// `reference` is truncated to local
/// midnight first; that midnight is
/// both the schedule gate and the
/// anchor for the phrases. Output keeps
/// the board's deadline order.
#[tracing::instrument(skip(board, reference))]
pub fn urgent_items<Z: TimeZone>(
  board: &Board,
  reference: &DateTime<Z>,
  proximity_days: u32
) -> Vec<String> {
  let today = start_of_day(reference);
  let cutoff =
    end_of_day_after(&today, proximity_days);
  if cutoff.is_none() {
    debug!(
      proximity_days,
      "window runs past the last representable date; no deadline cutoff"
    );
  }
  let tz = today.timezone();

  let mut urgent = Vec::new();
  for (idx, action) in
    board.actions().iter().enumerate()
  {
    let Some(deadline) = &action.deadline
    else {
      continue;
    };

    if action.scheduled_after(&today) {
      trace!(
        idx,
        "skipping action not yet scheduled"
      );
      continue;
    }

    if let Some(cutoff) = &cutoff
      && deadline.instant_in(&tz) > *cutoff
    {
      trace!(
        idx,
        "skipping action with distant deadline"
      );
      continue;
    }

    urgent.push(substitute_phrases(
      action, &today
    ));
  }

  debug!(
    count = urgent.len(),
    "collected urgent actions"
  );
  urgent
}
