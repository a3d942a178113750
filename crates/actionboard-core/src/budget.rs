use anyhow::{
  Context,
  anyhow
};

/// Focus level names, by level.
const FOCUS_LEVELS: [&str; 4] =
  ["min", "low", "med", "high"];

/// Parses a compact time budget such as
/// `1hr:30m` into minutes.
///
/// Segments are `:`-separated and each
/// is `<int>hr` or `<int>m`. An empty
/// spec is no limit (`Ok(None)`).
pub fn parse_time_spec(
  spec: &str
) -> anyhow::Result<Option<u32>> {
  let spec = spec.trim();
  if spec.is_empty() {
    return Ok(None);
  }

  let mut total: u32 = 0;
  for part in spec.split(':') {
    let minutes = if let Some(hours) =
      part.strip_suffix("hr")
    {
      parse_amount(hours, part)?
        .checked_mul(60)
        .ok_or_else(|| {
          anyhow!(
            "time part too large: {part}"
          )
        })?
    } else if let Some(minutes) =
      part.strip_suffix('m')
    {
      parse_amount(minutes, part)?
    } else {
      return Err(anyhow!(
        "invalid time part: {part}"
      ));
    };

    total = total
      .checked_add(minutes)
      .ok_or_else(|| {
        anyhow!(
          "time budget too large: \
           {spec}"
        )
      })?;
  }

  Ok(Some(total))
}

fn parse_amount(
  digits: &str,
  part: &str
) -> anyhow::Result<u32> {
  digits.trim().parse::<u32>().with_context(
    || {
      format!(
        "invalid amount in time part: \
         {part}"
      )
    }
  )
}

/// Parses a focus ceiling: a level
/// number, a level name (`min`, `low`,
/// `med`, `high`, or the long forms), or
/// `none`/`-1`/empty for no limit.
pub fn parse_focus(
  raw: &str
) -> anyhow::Result<Option<u8>> {
  let lower =
    raw.trim().to_ascii_lowercase();

  match lower.as_str() {
    | "" | "none" | "-1" => Ok(None),
    | "minimal" => Ok(Some(0)),
    | "medium" => Ok(Some(2)),
    | name => {
      if let Some(level) = FOCUS_LEVELS
        .iter()
        .position(|l| *l == name)
      {
        return Ok(Some(level as u8));
      }
      name.parse::<u8>().map(Some).map_err(
        |_| {
          anyhow!(
            "invalid focus value: {raw} \
             (expected 0-3, min, low, \
             med, high or none)"
          )
        }
      )
    }
  }
}
