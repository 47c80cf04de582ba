//! Flattening of remote replies into renderable text.
//!
//! Resolution order, first match wins:
//! 1. a task whose status carries a message with parts,
//! 2. a task with artifacts (first artifact only),
//! 3. a direct message.
//!
//! Only `text` parts contribute; they are joined with newlines in order.
//! When nothing yields text the sentinel [`NO_TEXT_SENTINEL`] is returned
//! instead of an empty string.

use crate::a2a::types::{Part, RemoteReply};

/// Returned when a reply contains no extractable text.
pub const NO_TEXT_SENTINEL: &str = "Could not extract text from agent response.";

pub fn to_display_text(reply: &RemoteReply) -> String {
    extract_text(reply)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_TEXT_SENTINEL.to_string())
}

/// Text picked by the resolution order, before the sentinel is applied.
fn extract_text(reply: &RemoteReply) -> Option<String> {
    match reply {
        RemoteReply::Task(task) => {
            let status_parts = task
                .status
                .message
                .as_ref()
                .map(|message| message.parts.as_slice())
                .filter(|parts| !parts.is_empty());
            status_parts
                .or_else(|| task.artifacts.first().map(|artifact| artifact.parts.as_slice()))
                .map(join_text_parts)
        }
        RemoteReply::Message(message) => Some(join_text_parts(&message.parts)),
    }
}

fn join_text_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .filter_map(Part::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn reply(value: Value) -> RemoteReply {
        serde_json::from_value(value).expect("reply")
    }

    #[rstest]
    #[case::message(
        json!({"kind": "message", "parts": [{"kind": "text", "text": "hi there"}]}),
        "hi there"
    )]
    #[case::message_multi(
        json!({"kind": "message", "parts": [
            {"kind": "text", "text": "line one"},
            {"kind": "data", "data": {"x": 1}},
            {"kind": "text", "text": "line two"}
        ]}),
        "line one\nline two"
    )]
    #[case::task_status(
        json!({"kind": "task", "id": "t", "status": {"state": "completed",
            "message": {"kind": "message", "role": "agent", "parts": [{"kind": "text", "text": "done"}]}}}),
        "done"
    )]
    #[case::task_first_artifact(
        json!({"kind": "task", "id": "t", "status": {"state": "completed"}, "artifacts": [
            {"artifactId": "a1", "parts": [{"kind": "text", "text": "first"}]},
            {"artifactId": "a2", "parts": [{"kind": "text", "text": "second"}]}
        ]}),
        "first"
    )]
    fn test_resolution(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(to_display_text(&reply(value)), expected);
    }

    #[test]
    fn test_status_message_wins_over_artifacts() {
        let value = json!({
            "kind": "task",
            "id": "t",
            "status": {"state": "completed", "message": {"kind": "message", "parts": [{"kind": "text", "text": "from status"}]}},
            "artifacts": [{"parts": [{"kind": "text", "text": "from artifact"}]}]
        });
        assert_eq!(to_display_text(&reply(value)), "from status");
    }

    #[test]
    fn test_empty_status_parts_fall_through_to_artifacts() {
        let value = json!({
            "kind": "task",
            "id": "t",
            "status": {"state": "completed", "message": {"kind": "message", "parts": []}},
            "artifacts": [{"parts": [{"kind": "text", "text": "from artifact"}]}]
        });
        assert_eq!(to_display_text(&reply(value)), "from artifact");
    }

    #[rstest]
    #[case::empty_message(json!({"kind": "message", "parts": []}))]
    #[case::only_media(json!({"kind": "message", "parts": [
        {"kind": "file", "file": {"uri": "https://example.com/cat.png"}},
        {"kind": "hologram", "payload": "opaque"}
    ]}))]
    #[case::bare_task(json!({"kind": "task", "id": "t", "status": {"state": "working"}}))]
    #[case::empty_text(json!({"kind": "message", "parts": [{"kind": "text", "text": ""}]}))]
    #[case::status_without_text(json!({"kind": "task", "id": "t",
        "status": {"state": "completed", "message": {"parts": [{"kind": "data", "data": {}}]}},
        "artifacts": [{"parts": [{"kind": "text", "text": "unreachable"}]}]}))]
    fn test_sentinel_when_no_text(#[case] value: Value) {
        assert_eq!(to_display_text(&reply(value)), NO_TEXT_SENTINEL);
    }
}
