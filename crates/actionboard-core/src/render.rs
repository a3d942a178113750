use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, TimeZone};
use unicode_width::UnicodeWidthStr;

use crate::board::NameTable;
use crate::config::Config;
use crate::datetime::{DEADLINE_CONNECTIVE, SCHEDULED_CONNECTIVE, format_relative_date};
use crate::payload::Action;

pub const SCHEDULED_PLACEHOLDER: &str = "{{ scheduled }}";
pub const DEADLINE_PLACEHOLDER: &str = "{{ deadline }}";

/// Fills the action's schedule and deadline placeholders with phrases
/// relative to `reference`. Only the first occurrence of each is replaced.
pub fn substitute_phrases<Z: TimeZone>(action: &Action, reference: &DateTime<Z>) -> String {
    let mut html = action.html.clone();

    if let Some(scheduled) = &action.scheduled {
        let phrase = format_relative_date(scheduled, reference, SCHEDULED_CONNECTIVE);
        html = html.replacen(SCHEDULED_PLACEHOLDER, &phrase, 1);
    }
    if let Some(deadline) = &action.deadline {
        let phrase = format_relative_date(deadline, reference, DEADLINE_CONNECTIVE);
        html = html.replacen(DEADLINE_PLACEHOLDER, &phrase, 1);
    }

    html
}

/// Writes view output, to stdout unless another sink is given.
pub struct Renderer {
    color: bool,
    out: Box<dyn Write>,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = color_enabled(cfg)? && io::stdout().is_terminal();
        Ok(Self {
            color,
            out: Box::new(io::stdout()),
        })
    }

    /// A renderer writing to `out`. Color is never applied.
    pub fn with_writer(cfg: &Config, out: Box<dyn Write>) -> anyhow::Result<Self> {
        color_enabled(cfg)?;
        Ok(Self { color: false, out })
    }

    /// Writes the fragments back to back, the way the page filled its
    /// action list.
    #[tracing::instrument(skip(self, fragments), fields(count = fragments.len()))]
    pub fn print_fragments(&mut self, fragments: &[String]) -> anyhow::Result<()> {
        write_fragments(&mut self.out, fragments)?;
        self.out.flush()?;
        Ok(())
    }

    #[tracing::instrument(skip(self, table))]
    pub fn print_name_table(
        &mut self,
        heading: &str,
        table: &NameTable,
        capitalize: bool,
    ) -> anyhow::Result<()> {
        let headers = vec![self.paint("#", "33"), self.paint(heading, "33")];
        let rows = table
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let shown = if capitalize {
                    capitalize_first(name)
                } else {
                    name.to_string()
                };
                vec![idx.to_string(), shown]
            })
            .collect();

        write_table(&mut self.out, headers, rows)?;
        self.out.flush()?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn color_enabled(cfg: &Config) -> anyhow::Result<bool> {
    let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
    match color_cfg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        other => Err(anyhow!("invalid color setting: {other}")),
    }
}

fn write_fragments<W: Write>(mut writer: W, fragments: &[String]) -> anyhow::Result<()> {
    for fragment in fragments {
        writer.write_all(fragment.as_bytes())?;
    }
    writeln!(writer)?;
    Ok(())
}

fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for row in std::iter::once(&headers).chain(rows.iter()) {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Europe::London;

    use super::{capitalize_first, substitute_phrases, write_fragments, write_table};
    use crate::payload::{Action, Keyword};

    #[test]
    fn fills_both_placeholders() {
        let reference = London
            .with_ymd_and_hms(2026, 10, 18, 0, 0, 0)
            .single()
            .expect("valid reference");
        let action = Action::new(
            "<pre>Scheduled {{ scheduled }}, due {{ deadline }}</pre>",
            Keyword::Todo,
        )
        .with_scheduled("2026-10-17", None)
        .and_then(|a| a.with_deadline("2026-10-20", Some("12:00:00")))
        .expect("valid stamps");

        assert_eq!(
            substitute_phrases(&action, &reference),
            "<pre>Scheduled yesterday, due on Tuesday at 12:00:00</pre>"
        );
    }

    #[test]
    fn missing_stamps_leave_placeholders() {
        let reference = London
            .with_ymd_and_hms(2026, 10, 18, 0, 0, 0)
            .single()
            .expect("valid reference");
        let action = Action::new("<pre>{{ deadline }}</pre>", Keyword::Prob);
        assert_eq!(substitute_phrases(&action, &reference), "<pre>{{ deadline }}</pre>");
    }

    #[test]
    fn fragments_are_joined_without_separator() {
        let mut out = Vec::new();
        write_fragments(&mut out, &["<pre>a</pre>".to_string(), "<pre>b</pre>".to_string()])
            .expect("write fragments");
        assert_eq!(String::from_utf8(out).expect("utf8"), "<pre>a</pre><pre>b</pre>\n");
    }

    #[test]
    fn table_pads_columns() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            vec!["#".to_string(), "Context".to_string()],
            vec![
                vec!["0".to_string(), "Home".to_string()],
                vec!["1".to_string(), "Computer".to_string()],
            ],
        )
        .expect("write table");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Context  ");
        assert_eq!(lines[2], "1 Computer ");
        assert_eq!(capitalize_first("computer"), "Computer");
    }
}
