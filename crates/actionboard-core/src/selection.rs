use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::payload::Keyword;

/// Which kinds of action the filtered
/// view shows.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum TypeTag {
  #[default]
  All,
  Tasks,
  Problems
}

impl TypeTag {
  pub fn admits(
    self,
    keyword: Keyword
  ) -> bool {
    match self {
      | TypeTag::All => true,
      | TypeTag::Tasks => {
        keyword == Keyword::Todo
      }
      | TypeTag::Problems => {
        keyword == Keyword::Prob
      }
    }
  }
}

impl FromStr for TypeTag {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str()
    {
      | "all" => Ok(TypeTag::All),
      | "tasks" => Ok(TypeTag::Tasks),
      | "problems" => {
        Ok(TypeTag::Problems)
      }
      | other => Err(anyhow!(
        "unknown type: {other} \
         (expected all, tasks or \
         problems)"
      ))
    }
  }
}

impl fmt::Display for TypeTag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | TypeTag::All => "all",
      | TypeTag::Tasks => "tasks",
      | TypeTag::Problems => "problems"
    })
  }
}

/// Arguments of the filtered view.
///
/// `None` fields impose no constraint.
/// A `Some` name list is active even when
/// none of its names resolve, in which
/// case nothing matches.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
)]
pub struct Criteria {
  pub contexts:  Option<Vec<String>>,
  pub people:    Option<Vec<String>>,
  pub max_time:  Option<String>,
  pub max_focus: Option<u8>,
  pub kind:      TypeTag
}

/// Whatever gathers the user's current
/// filter controls: a form, a command
/// line, a saved query.
pub trait SelectionSource {
  fn selected_contexts(&self)
  -> Vec<String>;

  fn selected_people(&self)
  -> Vec<String>;

  fn time_text(&self) -> Option<String>;

  fn focus_selection(
    &self
  ) -> anyhow::Result<Option<u8>>;

  fn type_tag(
    &self
  ) -> anyhow::Result<TypeTag>;
}

impl Criteria {
  /// Reads the source's controls. Empty
  /// multi-selects and blank time text
  /// mean "no filter".
  #[tracing::instrument(skip(source))]
  pub fn from_source(
    source: &dyn SelectionSource
  ) -> anyhow::Result<Self> {
    let contexts =
      non_empty(source.selected_contexts());
    let people =
      non_empty(source.selected_people());
    let max_time = source
      .time_text()
      .map(|text| text.trim().to_string())
      .filter(|text| !text.is_empty());

    let criteria = Self {
      contexts,
      people,
      max_time,
      max_focus: source
        .focus_selection()?,
      kind: source.type_tag()?
    };
    tracing::debug!(
      ?criteria,
      "read criteria from selection"
    );
    Ok(criteria)
  }
}

fn non_empty(
  names: Vec<String>
) -> Option<Vec<String>> {
  if names.is_empty() {
    None
  } else {
    Some(names)
  }
}

#[cfg(test)]
mod tests {
  use super::{
    Criteria,
    SelectionSource,
    TypeTag
  };
  use crate::payload::Keyword;

  struct Form {
    contexts: Vec<String>,
    time:     Option<String>,
    focus:    Option<u8>
  }

  impl SelectionSource for Form {
    fn selected_contexts(
      &self
    ) -> Vec<String> {
      self.contexts.clone()
    }

    fn selected_people(
      &self
    ) -> Vec<String> {
      vec![]
    }

    fn time_text(
      &self
    ) -> Option<String> {
      self.time.clone()
    }

    fn focus_selection(
      &self
    ) -> anyhow::Result<Option<u8>> {
      Ok(self.focus)
    }

    fn type_tag(
      &self
    ) -> anyhow::Result<TypeTag> {
      Ok(TypeTag::Tasks)
    }
  }

  #[test]
  fn empty_controls_mean_no_filter() {
    let form = Form {
      contexts: vec![],
      time:     Some("   ".to_string()),
      focus:    None
    };
    let criteria =
      Criteria::from_source(&form)
        .expect("read criteria");
    assert_eq!(
      criteria,
      Criteria {
        kind: TypeTag::Tasks,
        ..Criteria::default()
      }
    );
  }

  #[test]
  fn filled_controls_carry_over() {
    let form = Form {
      contexts: vec!["home".to_string()],
      time:     Some("1hr".to_string()),
      focus:    Some(2)
    };
    let criteria =
      Criteria::from_source(&form)
        .expect("read criteria");
    assert_eq!(
      criteria.contexts,
      Some(vec!["home".to_string()])
    );
    assert_eq!(criteria.people, None);
    assert_eq!(
      criteria.max_time.as_deref(),
      Some("1hr")
    );
    assert_eq!(criteria.max_focus, Some(2));
  }

  #[test]
  fn type_tags_gate_keywords() {
    assert!(
      TypeTag::All.admits(Keyword::Proj)
    );
    assert!(
      TypeTag::Tasks.admits(Keyword::Todo)
    );
    assert!(
      !TypeTag::Tasks
        .admits(Keyword::Prob)
    );
    assert!(
      TypeTag::Problems
        .admits(Keyword::Prob)
    );
    assert!(
      "problems"
        .parse::<TypeTag>()
        .is_ok()
    );
    assert!(
      "projects"
        .parse::<TypeTag>()
        .is_err()
    );
  }
}
