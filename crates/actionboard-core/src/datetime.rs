use std::fs;
use std::path::PathBuf;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Offset,
  TimeZone,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::config::Config;
use crate::payload::PlanningStamp;

const TIMEZONE_CONFIG_FILE: &str =
  "actionboard-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "ACTIONBOARD_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "ACTIONBOARD_TIME_CONFIG";

/// Connective used when phrasing a
/// scheduled stamp ("for Friday").
pub const SCHEDULED_CONNECTIVE: &str =
  "for";
/// Connective used when phrasing a
/// deadline ("on Friday").
pub const DEADLINE_CONNECTIVE: &str =
  "on";

const MILLIS_PER_DAY: i64 =
  24 * 60 * 60 * 1000;

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Resolves the zone views are computed
/// in. `None` means the system local
/// zone.
///
/// Sources, first hit wins: the
/// `ACTIONBOARD_TIMEZONE` variable, the
/// `timezone` rc key, then a TOML file
/// (`ACTIONBOARD_TIME_CONFIG` or
/// `./actionboard-time.toml`).
pub fn resolve_timezone(
  cfg: &Config
) -> Option<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return Some(tz);
  }

  if let Some(raw) = cfg.get("timezone")
    && let Some(tz) =
      parse_timezone(&raw, "rc:timezone")
  {
    return Some(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return Some(tz);
  }

  tracing::debug!(
    "no timezone configured; using \
     system local zone"
  );
  None
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::trace!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Pins a wall-clock time to an instant
/// in `tz`.
///
/// Ambiguous times (DST fall-back) take
/// the earliest instant. Times inside a
/// DST gap are pushed forward by the
/// size of the gap, so `02:30` on a
/// spring-forward night lands on
/// `03:30`.
pub fn resolve_local<Z: TimeZone>(
  tz: &Z,
  local_naive: NaiveDateTime
) -> DateTime<Z> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      local_dt
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        local = %local_naive,
        "ambiguous local datetime; using earliest"
      );
      if first <= second {
        first
      } else {
        second
      }
    }
    | LocalResult::None => {
      let offset_secs = local_naive
        .checked_sub_signed(
          Duration::days(1)
        )
        .and_then(|before| {
          tz.from_local_datetime(&before)
            .earliest()
        })
        .map(|dt| {
          dt.offset()
            .fix()
            .local_minus_utc()
        })
        .unwrap_or(0);
      tracing::warn!(
        local = %local_naive,
        offset_secs,
        "local datetime falls in a gap; shifting forward"
      );
      // Clamp at the edge of the
      // representable range.
      let utc = local_naive
        .checked_sub_signed(
          Duration::seconds(i64::from(
            offset_secs
          ))
        )
        .unwrap_or(local_naive);
      tz.from_utc_datetime(&utc)
    }
  }
}

/// Local midnight of the day `instant`
/// falls on.
#[must_use]
pub fn start_of_day<Z: TimeZone>(
  instant: &DateTime<Z>
) -> DateTime<Z> {
  resolve_local(
    &instant.timezone(),
    instant
      .date_naive()
      .and_time(NaiveTime::MIN)
  )
}

/// Last millisecond (23:59:59.999) of
/// the local day `days` after the day
/// `instant` falls on, or `None` when
/// that day is past the last
/// representable date.
#[must_use]
pub fn end_of_day_after<Z: TimeZone>(
  instant: &DateTime<Z>,
  days: u32
) -> Option<DateTime<Z>> {
  let last_millis = instant
    .date_naive()
    .checked_add_days(Days::new(
      u64::from(days)
    ))?
    .and_hms_milli_opt(23, 59, 59, 999)?;
  Some(resolve_local(
    &instant.timezone(),
    last_millis
  ))
}

/// Whole days from `reference` to local
/// midnight of `date`, rounded toward
/// negative infinity.
#[must_use]
pub fn day_difference<Z: TimeZone>(
  date: NaiveDate,
  reference: &DateTime<Z>
) -> i64 {
  let midnight = resolve_local(
    &reference.timezone(),
    date.and_time(NaiveTime::MIN)
  );
  (midnight - reference.clone())
    .num_milliseconds()
    .div_euclid(MILLIS_PER_DAY)
}

/// Renders `stamp` as a phrase relative
/// to `reference`: "today", "for
/// Friday", "last Monday", "next
/// Tuesday at 09:00:00", or the long
/// form "on Sunday 2026-11-08".
///
/// `reference` may carry a time of
/// day; the day distance is floored, so
/// a stamp for today measured from
/// 10:00 reads as "yesterday".
#[must_use]
pub fn format_relative_date<
  Z: TimeZone
>(
  stamp: &PlanningStamp,
  reference: &DateTime<Z>,
  connective: &str
) -> String {
  let days =
    day_difference(stamp.date, reference);
  let weekday =
    weekday_name(stamp.date.weekday());

  let mut phrase = match days {
    | 0 => "today".to_string(),
    | 1 => "tomorrow".to_string(),
    | -1 => "yesterday".to_string(),
    | 2..=6 => {
      format!("{connective} {weekday}")
    }
    | -6..=-2 => {
      format!("last {weekday}")
    }
    | 8..=13 => {
      format!("next {weekday}")
    }
    | _ => format!(
      "{connective} {weekday} {}",
      stamp.date_text()
    )
  };

  if let Some(time) = stamp.time_text()
  {
    phrase.push_str(" at ");
    phrase.push_str(time);
  }

  phrase
}

fn weekday_name(
  weekday: Weekday
) -> &'static str {
  match weekday {
    | Weekday::Mon => "Monday",
    | Weekday::Tue => "Tuesday",
    | Weekday::Wed => "Wednesday",
    | Weekday::Thu => "Thursday",
    | Weekday::Fri => "Friday",
    | Weekday::Sat => "Saturday",
    | Weekday::Sun => "Sunday"
  }
}

/// Parses the `--at` override for "now".
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr<Z: TimeZone>(
  input: &str,
  now: &DateTime<Z>
) -> anyhow::Result<DateTime<Z>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let tz = now.timezone();

  match lower.as_str() {
    | "now" => return Ok(now.clone()),
    | "today" => {
      return Ok(start_of_day(now));
    }
    | "tomorrow" => {
      let tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "failed to advance to \
             tomorrow"
          )
        })?;
      return Ok(resolve_local(
        &tz,
        tomorrow.and_time(NaiveTime::MIN)
      ));
    }
    | "yesterday" => {
      let yesterday = now
        .date_naive()
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "failed to step back to \
             yesterday"
          )
        })?;
      return Ok(resolve_local(
        &tz,
        yesterday
          .and_time(NaiveTime::MIN)
      ));
    }
    | _ => {}
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => {
        Duration::try_minutes(num)
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    }
    .ok_or_else(|| {
      anyhow!(
        "relative offset out of \
         range: {token}"
      )
    })?;

    let shifted = if sign == "-" {
      now
        .clone()
        .checked_sub_signed(duration)
    } else {
      now
        .clone()
        .checked_add_signed(duration)
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "relative offset moves past \
         the representable range: \
         {token}"
      )
    });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&tz));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(resolve_local(
      &tz,
      date.and_time(NaiveTime::MIN)
    ));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(resolve_local(&tz, ndt));
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     +Nd/+Nh/+Nm, RFC3339, YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM[:SS], \
     YYYY-MM-DD HH:MM"
  })
}
