use chrono::{
  DateTime,
  TimeZone
};
use tracing::{
  info,
  instrument
};

use crate::board::Board;
use crate::cli::{
  Command,
  FilterArgs,
  UrgentArgs
};
use crate::config::Config;
use crate::datetime::parse_date_expr;
use crate::render::Renderer;
use crate::selection::Criteria;

/// Runs `command` against `board` as of
/// `now`, or as of `at` when given.
#[instrument(skip(
  board, cfg, renderer, now
))]
pub fn dispatch<Z: TimeZone>(
  board: &Board,
  cfg: &Config,
  renderer: &mut Renderer,
  command: Command,
  now: DateTime<Z>,
  at: Option<&str>
) -> anyhow::Result<()> {
  let now = match at {
    | Some(expr) => {
      parse_date_expr(expr, &now)?
    }
    | None => now
  };

  match command {
    | Command::Urgent(args) => {
      cmd_urgent(
        board, cfg, renderer, &args,
        &now
      )
    }
    | Command::Filter(args) => {
      cmd_filter(
        board, renderer, &args, &now
      )
    }
    | Command::Contexts => {
      info!("command contexts");
      renderer.print_name_table(
        "Context",
        board.contexts(),
        true
      )
    }
    | Command::People => {
      info!("command people");
      renderer.print_name_table(
        "Person",
        board.people(),
        false
      )
    }
  }
}

#[instrument(skip(
  board, cfg, renderer, now
))]
fn cmd_urgent<Z: TimeZone>(
  board: &Board,
  cfg: &Config,
  renderer: &mut Renderer,
  args: &UrgentArgs,
  now: &DateTime<Z>
) -> anyhow::Result<()> {
  let days = match args.days {
    | Some(days) => days,
    | None => cfg.proximity_days()?
  };
  info!(days, "command urgent");

  let urgent = board.urgent(now, days);
  renderer.print_fragments(&urgent)
}

#[instrument(skip(
  board, renderer, now
))]
fn cmd_filter<Z: TimeZone>(
  board: &Board,
  renderer: &mut Renderer,
  args: &FilterArgs,
  now: &DateTime<Z>
) -> anyhow::Result<()> {
  info!("command filter");

  let criteria =
    Criteria::from_source(args)?;
  let filtered =
    board.filter(now, &criteria)?;
  renderer.print_fragments(&filtered)
}
