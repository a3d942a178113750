pub mod board;
pub mod budget;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod filter;
pub mod payload;
pub mod render;
pub mod selection;
pub mod urgent;

use std::ffi::OsString;
use std::io::Write;

use anyhow::Context;
use chrono::{
  Local,
  Utc
};
use clap::Parser;
use tracing::{
  debug,
  info
};

pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  run_inner(raw_args, None)
}

/// Same as [`run`], with view output
/// sent to `out` instead of stdout.
pub fn run_with_output(
  raw_args: Vec<OsString>,
  out: Box<dyn Write>
) -> anyhow::Result<()> {
  run_inner(raw_args, Some(out))
}

#[tracing::instrument(skip_all)]
fn run_inner(
  raw_args: Vec<OsString>,
  out: Option<Box<dyn Write>>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting actionboard"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let payload_path =
    config::resolve_payload_path(
      &cfg,
      cli.payload.as_deref()
    )
    .context(
      "failed to resolve actions \
       payload"
    )?;

  let board =
    board::Board::load(&payload_path)
      .with_context(|| {
        format!(
          "failed to open actions \
           payload at {}",
          payload_path.display()
        )
      })?;

  let mut renderer = match out {
    | Some(out) => {
      render::Renderer::with_writer(
        &cfg, out
      )?
    }
    | None => {
      render::Renderer::new(&cfg)?
    }
  };
  let command = match cli.command {
    | Some(command) => command,
    | None => {
      cli::Command::from_default(&cfg)?
    }
  };

  let at = cli.at.as_deref();
  match datetime::resolve_timezone(&cfg)
  {
    | Some(tz) => commands::dispatch(
      &board,
      &cfg,
      &mut renderer,
      command,
      Utc::now().with_timezone(&tz),
      at
    )?,
    | None => commands::dispatch(
      &board,
      &cfg,
      &mut renderer,
      command,
      Local::now(),
      at
    )?
  }

  info!("done");
  Ok(())
}
