use std::collections::BTreeSet;

use anyhow::Context;
use chrono::{
  DateTime,
  NaiveDate,
  NaiveTime,
  TimeZone
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::resolve_local;

/// Task-type discriminator carried by
/// every action.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Keyword {
  /// Action item.
  Todo,
  /// Open problem.
  Prob,
  /// Project.
  Proj
}

/// A planning timestamp: a calendar date
/// with an optional clock time.
///
/// Encoded on the wire as
/// `["YYYY-MM-DD", "HH:MM:SS" | null]`.
/// The source strings are kept so
/// phrases can echo them unchanged.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(
  try_from = "RawStamp",
  into = "RawStamp"
)]
pub struct PlanningStamp {
  pub date:  NaiveDate,
  pub time:  Option<NaiveTime>,
  date_text: String,
  time_text: Option<String>
}

type RawStamp = (String, Option<String>);

impl PlanningStamp {
  pub fn parse(
    date: &str,
    time: Option<&str>
  ) -> anyhow::Result<Self> {
    let parsed_date =
      NaiveDate::parse_from_str(
        date, "%Y-%m-%d"
      )
      .with_context(|| {
        format!(
          "invalid stamp date: {date}"
        )
      })?;
    let parsed_time = time
      .map(|raw| {
        NaiveTime::parse_from_str(
          raw, "%H:%M:%S"
        )
        .or_else(|_| {
          NaiveTime::parse_from_str(
            raw, "%H:%M"
          )
        })
        .with_context(|| {
          format!(
            "invalid stamp time: {raw}"
          )
        })
      })
      .transpose()?;

    Ok(Self {
      date:      parsed_date,
      time:      parsed_time,
      date_text: date.to_string(),
      time_text: time
        .map(str::to_string)
    })
  }

  pub fn date_text(&self) -> &str {
    &self.date_text
  }

  pub fn time_text(
    &self
  ) -> Option<&str> {
    self.time_text.as_deref()
  }

  /// The stamp as an instant in `tz`,
  /// at local midnight when no time is
  /// given.
  #[must_use]
  pub fn instant_in<Z: TimeZone>(
    &self,
    tz: &Z
  ) -> DateTime<Z> {
    resolve_local(
      tz,
      self.date.and_time(
        self.time.unwrap_or(
          NaiveTime::MIN
        )
      )
    )
  }
}

impl TryFrom<RawStamp> for PlanningStamp {
  type Error = anyhow::Error;

  fn try_from(
    (date, time): RawStamp
  ) -> Result<Self, Self::Error> {
    Self::parse(&date, time.as_deref())
  }
}

impl From<PlanningStamp> for RawStamp {
  fn from(stamp: PlanningStamp) -> Self {
    (stamp.date_text, stamp.time_text)
  }
}

/// One entry of the dashboard's action
/// list.
///
/// Decoded from the fixed-shape array
/// `[html, scheduled, deadline,
/// contexts, people, focus, time,
/// keyword]`.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(
  from = "RawAction",
  into = "RawAction"
)]
pub struct Action {
  pub html:      String,
  pub scheduled: Option<PlanningStamp>,
  pub deadline:  Option<PlanningStamp>,
  pub contexts:  BTreeSet<usize>,
  pub people:    BTreeSet<usize>,
  pub focus:     u8,
  /// Estimated minutes; `None` never
  /// exceeds a time budget.
  pub time:      Option<u32>,
  pub keyword:   Keyword
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
struct RawAction(
  String,
  Option<PlanningStamp>,
  Option<PlanningStamp>,
  Vec<usize>,
  Vec<usize>,
  u8,
  Option<u32>,
  Keyword
);

impl From<RawAction> for Action {
  fn from(raw: RawAction) -> Self {
    let RawAction(
      html,
      scheduled,
      deadline,
      contexts,
      people,
      focus,
      time,
      keyword
    ) = raw;
    Self {
      html,
      scheduled,
      deadline,
      contexts: contexts
        .into_iter()
        .collect(),
      people: people
        .into_iter()
        .collect(),
      focus,
      time,
      keyword
    }
  }
}

impl From<Action> for RawAction {
  fn from(action: Action) -> Self {
    RawAction(
      action.html,
      action.scheduled,
      action.deadline,
      action
        .contexts
        .into_iter()
        .collect(),
      action.people.into_iter().collect(),
      action.focus,
      action.time,
      action.keyword
    )
  }
}

impl Action {
  pub fn new(
    html: impl Into<String>,
    keyword: Keyword
  ) -> Self {
    Self {
      html: html.into(),
      scheduled: None,
      deadline: None,
      contexts: BTreeSet::new(),
      people: BTreeSet::new(),
      focus: 0,
      time: None,
      keyword
    }
  }

  pub fn with_scheduled(
    mut self,
    date: &str,
    time: Option<&str>
  ) -> anyhow::Result<Self> {
    self.scheduled =
      Some(PlanningStamp::parse(
        date, time
      )?);
    Ok(self)
  }

  pub fn with_deadline(
    mut self,
    date: &str,
    time: Option<&str>
  ) -> anyhow::Result<Self> {
    self.deadline =
      Some(PlanningStamp::parse(
        date, time
      )?);
    Ok(self)
  }

  /// True when the action is scheduled
  /// strictly after `reference`.
  pub fn scheduled_after<
    Z: TimeZone
  >(
    &self,
    reference: &DateTime<Z>
  ) -> bool {
    self
      .scheduled
      .as_ref()
      .map(|stamp| {
        stamp.instant_in(
          &reference.timezone()
        ) > *reference
      })
      .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use super::{
    Action,
    Keyword,
    PlanningStamp
  };

  #[test]
  fn decodes_tuple_shaped_action() {
    let raw = r#"[
      "<pre>{{ deadline }}</pre>",
      ["2026-10-20", null],
      ["2026-10-22", "17:00:00"],
      [0, 2],
      [],
      1,
      45,
      "TODO"
    ]"#;
    let action: Action =
      serde_json::from_str(raw)
        .expect("decode action");

    assert_eq!(
      action.html,
      "<pre>{{ deadline }}</pre>"
    );
    assert_eq!(
      action
        .scheduled
        .as_ref()
        .map(PlanningStamp::date_text),
      Some("2026-10-20")
    );
    assert_eq!(
      action
        .deadline
        .as_ref()
        .and_then(
          PlanningStamp::time_text
        ),
      Some("17:00:00")
    );
    assert_eq!(
      action
        .contexts
        .iter()
        .copied()
        .collect::<Vec<_>>(),
      vec![0, 2]
    );
    assert!(action.people.is_empty());
    assert_eq!(action.time, Some(45));
    assert_eq!(
      action.keyword,
      Keyword::Todo
    );
  }

  #[test]
  fn null_time_estimate_is_unspecified()
  {
    let raw = r#"["x", null, null, [], [], 0, null, "PROB"]"#;
    let action: Action =
      serde_json::from_str(raw)
        .expect("decode action");
    assert_eq!(action.time, None);
    assert_eq!(
      action.keyword,
      Keyword::Prob
    );
  }

  #[test]
  fn malformed_stamp_fails_decoding() {
    let raw = r#"["x", ["20-10-2026", null], null, [], [], 0, 5, "TODO"]"#;
    let err =
      serde_json::from_str::<Action>(
        raw
      )
      .expect_err("bad date rejected");
    assert!(
      err
        .to_string()
        .contains("invalid stamp date")
    );
  }

  #[test]
  fn encodes_back_to_tuple_shape() {
    let action = Action::new(
      "<pre>a</pre>",
      Keyword::Todo
    )
    .with_deadline(
      "2026-10-22",
      Some("17:00:00")
    )
    .expect("valid deadline");
    let encoded =
      serde_json::to_string(&action)
        .expect("encode action");
    assert_eq!(
      encoded,
      r#"["<pre>a</pre>",null,["2026-10-22","17:00:00"],[],[],0,null,"TODO"]"#
    );
  }
}
