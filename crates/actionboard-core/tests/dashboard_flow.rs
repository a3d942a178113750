use std::ffi::OsString;
use std::fs;

use actionboard_core::board::Board;
use actionboard_core::selection::{Criteria, TypeTag};
use chrono::TimeZone;
use chrono_tz::America::Los_Angeles;
use tempfile::tempdir;

const PAYLOAD: &str = r#"[
  ["work", "home", "computer"],
  ["Alice", "Bob"],
  [
    ["<pre>File taxes, due {{ deadline }}</pre>", null, ["2026-10-20", null], [1], [], 2, 60, "TODO"],
    ["<pre>Call Bob {{ scheduled }}, due {{ deadline }}</pre>", ["2026-10-19", null], ["2026-10-20", "17:00:00"], [], [1], 0, 10, "TODO"],
    ["<pre>Fix build, due {{ deadline }}</pre>", null, ["2026-10-22", null], [0, 2], [], 3, 90, "TODO"],
    ["<pre>Why is the cache cold?</pre>", null, null, [2], [], 2, null, "PROB"],
    ["<pre>Tidy desk</pre>", ["2026-10-12", "08:00:00"], null, [1], [], 0, 15, "TODO"]
  ]
]"#;

fn load_board() -> Board {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("actions.json");
    fs::write(&path, PAYLOAD).expect("write payload");
    Board::load(&path).expect("load board")
}

fn names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| s.to_string()).collect())
}

#[test]
fn urgent_view_over_loaded_payload() {
    let board = load_board();
    let reference = Los_Angeles
        .with_ymd_and_hms(2026, 10, 18, 9, 30, 0)
        .single()
        .expect("valid reference");

    let urgent = board.urgent(&reference, 3);
    assert_eq!(urgent, vec!["<pre>File taxes, due on Tuesday</pre>"]);

    let next_day = Los_Angeles
        .with_ymd_and_hms(2026, 10, 19, 7, 0, 0)
        .single()
        .expect("valid reference");
    assert_eq!(
        board.urgent(&next_day, 3),
        vec![
            "<pre>File taxes, due tomorrow</pre>",
            "<pre>Call Bob today, due tomorrow at 17:00:00</pre>",
            "<pre>Fix build, due on Thursday</pre>",
        ]
    );
}

#[test]
fn filtered_view_over_loaded_payload() {
    let board = load_board();
    let reference = Los_Angeles
        .with_ymd_and_hms(2026, 10, 18, 9, 30, 0)
        .single()
        .expect("valid reference");

    let at_home = Criteria {
        contexts: names(&["home"]),
        ..Criteria::default()
    };
    assert_eq!(
        board.filter(&reference, &at_home).expect("filter"),
        vec![
            "<pre>File taxes, due on Tuesday</pre>",
            "<pre>Tidy desk</pre>",
        ]
    );

    let at_desk = Criteria {
        contexts: names(&["work", "computer"]),
        max_time: Some("1hr:30m".to_string()),
        ..Criteria::default()
    };
    assert_eq!(
        board.filter(&reference, &at_desk).expect("filter"),
        vec![
            "<pre>Fix build, due on Thursday</pre>",
            "<pre>Why is the cache cold?</pre>",
        ]
    );

    let problems = Criteria {
        kind: TypeTag::Problems,
        ..Criteria::default()
    };
    assert_eq!(
        board.filter(&reference, &problems).expect("filter"),
        vec!["<pre>Why is the cache cold?</pre>"]
    );

    let with_bob = Criteria {
        people: names(&["Bob"]),
        ..Criteria::default()
    };
    assert!(board.filter(&reference, &with_bob).expect("filter").is_empty());
}

#[test]
fn cli_runs_views_against_payload_file() {
    let temp = tempdir().expect("tempdir");
    let payload = temp.path().join("actions.json");
    let rc = temp.path().join("test.rc");
    let output = temp.path().join("view.out");
    fs::write(&payload, PAYLOAD).expect("write payload");
    fs::write(
        &rc,
        "color = off\nurgent.proximity = 2\ntimezone = America/Los_Angeles\n",
    )
    .expect("write rc");

    let base = |rest: &[&str]| -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "actionboard".into(),
            "--config".into(),
            rc.clone().into_os_string(),
            "--payload".into(),
            payload.clone().into_os_string(),
            "--at".into(),
            "2026-10-18T09:30".into(),
        ];
        args.extend(rest.iter().map(OsString::from));
        args
    };
    let capture = |rest: &[&str]| -> String {
        let file = fs::File::create(&output).expect("create output");
        actionboard_core::run_with_output(base(rest), Box::new(file)).expect("run view");
        fs::read_to_string(&output).expect("read output")
    };

    // urgent.proximity = 2 stops the window at Tuesday.
    assert_eq!(capture(&[]), "<pre>File taxes, due on Tuesday</pre>\n");
    assert_eq!(capture(&["rc.urgent.proximity=0"]), "\n");
    assert_eq!(
        capture(&["urgent", "--days", "5"]),
        "<pre>File taxes, due on Tuesday</pre><pre>Fix build, due on Thursday</pre>\n"
    );
    assert_eq!(
        capture(&["filter", "-c", "home", "-t", "45m", "-f", "low"]),
        "<pre>Tidy desk</pre>\n"
    );

    let table = capture(&["contexts"]);
    let rows: Vec<&str> = table.lines().map(str::trim_end).collect();
    assert_eq!(rows, vec!["# Context", "0 Work", "1 Home", "2 Computer"]);

    actionboard_core::run(base(&["people"])).expect("people table on stdout");

    let err = actionboard_core::run(base(&["filter", "-t", "1day"]))
        .expect_err("bad time spec");
    assert!(format!("{err:#}").contains("invalid time part: 1day"));
}
