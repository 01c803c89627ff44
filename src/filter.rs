//! Update filter — pure extraction of new inbound messages from a raw batch.

use crate::telegram::UpdatesResponse;

/// Substituted for messages that arrive without text (stickers, photos,
/// joins). Guarantees the relay always has a sendable payload.
pub const MISSING_TEXT_PLACEHOLDER: &str = "This message has no text";

/// A well-formed inbound message extracted from an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub chat_id: i64,
    pub ts: i64,
}

/// Extract the messages from `batch` that are strictly newer than
/// `watermark`, in the order the API returned them.
///
/// Skip cases, all non-fatal: a batch that is not `ok` or has no result
/// list; updates that carry no message; messages missing `chat.id` or
/// `date`. `ts == watermark` is already-processed and excluded.
///
/// The API documents ascending `date` order within a batch. The filter
/// deliberately does not re-sort — a re-sort would hide a contract
/// violation instead of letting it show up downstream.
pub fn new_messages(batch: &UpdatesResponse, watermark: i64) -> Vec<InboundMessage> {
    if !batch.ok {
        return Vec::new();
    }
    let Some(updates) = batch.result.as_ref() else {
        return Vec::new();
    };

    updates
        .iter()
        .filter_map(|update| update.message.as_ref())
        .filter_map(|msg| {
            let chat_id = msg.chat.as_ref()?.id?;
            let ts = msg.date?;
            Some(InboundMessage {
                text: msg
                    .text
                    .clone()
                    .unwrap_or_else(|| MISSING_TEXT_PLACEHOLDER.to_string()),
                chat_id,
                ts,
            })
        })
        .filter(|msg| msg.ts > watermark)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(raw: &str) -> UpdatesResponse {
        serde_json::from_str(raw).unwrap()
    }

    fn batch_with_dates(dates: &[i64]) -> UpdatesResponse {
        let updates: Vec<serde_json::Value> = dates
            .iter()
            .map(|d| {
                serde_json::json!({
                    "update_id": d,
                    "message": {"text": format!("m{d}"), "chat": {"id": 7}, "date": d}
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({"ok": true, "result": updates})).unwrap()
    }

    #[test]
    fn not_ok_batch_yields_nothing() {
        assert!(new_messages(&batch(r#"{"ok": false}"#), 0).is_empty());
    }

    #[test]
    fn empty_object_yields_nothing() {
        assert!(new_messages(&batch("{}"), 0).is_empty());
    }

    #[test]
    fn ok_without_result_yields_nothing() {
        assert!(new_messages(&batch(r#"{"ok": true}"#), 0).is_empty());
    }

    #[test]
    fn strict_watermark_excludes_equal_ts() {
        let msgs = new_messages(&batch_with_dates(&[5, 7, 9]), 7);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].ts, 9);
    }

    #[test]
    fn zero_watermark_keeps_all_in_order() {
        let msgs = new_messages(&batch_with_dates(&[5, 7, 9]), 0);
        let ts: Vec<i64> = msgs.iter().map(|m| m.ts).collect();
        assert_eq!(ts, vec![5, 7, 9]);
    }

    #[test]
    fn api_order_preserved_not_resorted() {
        // An out-of-order batch violates the API contract; the filter must
        // pass it through verbatim rather than mask it.
        let msgs = new_messages(&batch_with_dates(&[9, 5, 7]), 0);
        let ts: Vec<i64> = msgs.iter().map(|m| m.ts).collect();
        assert_eq!(ts, vec![9, 5, 7]);
    }

    #[test]
    fn non_message_updates_are_skipped() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 1, "edited_message": {"text": "x"}},
                {"update_id": 2, "message": {"text": "keep", "chat": {"id": 3}, "date": 10}}
            ]
        }"#;
        let msgs = new_messages(&batch(raw), 0);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "keep");
    }

    #[test]
    fn missing_chat_id_or_date_drops_record_only() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"message": {"text": "no chat", "date": 10}},
                {"message": {"text": "no date", "chat": {"id": 3}}},
                {"message": {"text": "whole", "chat": {"id": 3}, "date": 11}}
            ]
        }"#;
        let msgs = new_messages(&batch(raw), 0);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "whole");
    }

    #[test]
    fn missing_text_gets_placeholder() {
        let raw = r#"{
            "ok": true,
            "result": [{"message": {"chat": {"id": 3}, "date": 10}}]
        }"#;
        let msgs = new_messages(&batch(raw), 0);
        assert_eq!(msgs[0].text, MISSING_TEXT_PLACEHOLDER);
        assert!(!msgs[0].text.is_empty());
    }

    #[test]
    fn duplicate_timestamps_all_kept() {
        let msgs = new_messages(&batch_with_dates(&[4, 4, 4]), 3);
        assert_eq!(msgs.len(), 3);
    }
}
