//! Tape-driven session: write a tape, replay it, export every artifact.

use std::sync::Arc;

use chrono::Utc;
use tempfile::tempdir;

use casetape::export::{default_exporters, export_all};
use casetape::record::{run_from_tape, NullScreenshotter, UnavailableBodyFetcher};
use casetape::{
    ActionKind, ElementDescriptor, EventTape, PageMessage, RawActionEvent, SessionMeta, TapeWriter,
};

fn action(id: &str, kind: ActionKind, value: Option<&str>) -> PageMessage {
    PageMessage::Action {
        event: RawActionEvent {
            kind,
            element: ElementDescriptor {
                selector: format!("#{id}"),
                structural_path: format!("//*[@id=\"{id}\"]"),
                tag_name: "input".to_string(),
                visible_text: None,
                placeholder: Some(id.to_string()),
                attributes: Default::default(),
                bounding_box: Default::default(),
            },
            value: value.map(str::to_string),
            value_label: None,
            key: None,
            coordinates: None,
            occurred_at: Utc::now(),
        },
    }
}

#[tokio::test]
async fn recorded_tape_replays_into_exported_artifacts() {
    let dir = tempdir().unwrap();
    let tape_path = dir.path().join("events.jsonl");

    let writer = TapeWriter::create(&tape_path).unwrap();
    writer.append_at(0, PageMessage::Start).unwrap();
    writer
        .append_at(100, action("email", ActionKind::Input, Some("qa@example.test")))
        .unwrap();
    writer
        .append_at(700, action("submit", ActionKind::Click, None))
        .unwrap();
    writer.append_at(900, PageMessage::Stop).unwrap();
    drop(writer);

    let tape = EventTape::read_from_path(&tape_path).unwrap();
    let testcase = run_from_tape(
        tape,
        SessionMeta {
            name: "signup".to_string(),
            start_url: "https://example.test/signup".to_string(),
            browser: "chromium".to_string(),
            viewport: Default::default(),
            user_agent: "chromium".to_string(),
        },
        Arc::new(NullScreenshotter),
        Arc::new(UnavailableBodyFetcher),
    )
    .await
    .unwrap();

    assert_eq!(testcase.total_steps, 2);
    assert_eq!(
        testcase.steps[0].short_description,
        "Type 'qa@example.test' in email"
    );

    let out_dir = dir.path().join("out");
    let written = export_all(&default_exporters(), &testcase, &out_dir).unwrap();
    assert_eq!(written.len(), 3);
    assert!(out_dir.join("testcase.json").is_file());
    assert!(out_dir.join("testcase.md").is_file());
    assert!(out_dir.join("testcase.html").is_file());

    let md = std::fs::read_to_string(out_dir.join("testcase.md")).unwrap();
    assert!(md.contains("# signup"));
    assert!(md.contains("Type 'qa@example.test' in email"));
}
