//! End-to-end restart behavior against a real on-disk store.
//!
//! Simulates the worst-case crash window: the process dies after the
//! append for a message but before the in-memory watermark moved. The
//! next process must recompute the watermark from the store and must not
//! relay that message again.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tg_repeater::error::TransportError;
use tg_repeater::relay::RelayLoop;
use tg_repeater::store::{DeliveryRecord, DeliveryStore, LibSqlStore};
use tg_repeater::telegram::{Transport, UpdatesResponse};

struct ScriptedTransport {
    batches: Mutex<VecDeque<Option<UpdatesResponse>>>,
    sent: Mutex<Vec<(i64, String)>>,
}

impl ScriptedTransport {
    fn new(batches: Vec<Option<UpdatesResponse>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch_updates(&self) -> Option<UpdatesResponse> {
        self.batches.lock().unwrap().pop_front().flatten()
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

fn batch(entries: &[(i64, i64, &str)]) -> Option<UpdatesResponse> {
    let updates: Vec<serde_json::Value> = entries
        .iter()
        .map(|(chat_id, ts, text)| {
            serde_json::json!({
                "update_id": ts,
                "message": {"text": text, "chat": {"id": chat_id}, "date": ts}
            })
        })
        .collect();
    Some(serde_json::from_value(serde_json::json!({"ok": true, "result": updates})).unwrap())
}

async fn relay_over(
    path: &std::path::Path,
    transport: Arc<ScriptedTransport>,
) -> (RelayLoop, Arc<LibSqlStore>) {
    let store = Arc::new(LibSqlStore::new_local(path).await.unwrap());
    let relay = RelayLoop::recover(
        transport,
        Arc::clone(&store) as Arc<dyn DeliveryStore>,
        Duration::from_millis(1),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap();
    (relay, store)
}

#[tokio::test]
async fn crash_after_append_before_advance_does_not_redeliver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.db");

    // First process: relays ts 5 and 7 normally, then "crashes" right
    // after appending ts=9 — the in-memory watermark never saw 9.
    {
        let transport = Arc::new(ScriptedTransport::new(vec![batch(&[
            (1, 5, "five"),
            (1, 7, "seven"),
        ])]));
        let (mut relay, store) = relay_over(&path, Arc::clone(&transport)).await;
        relay.run_cycle().await.unwrap();
        assert_eq!(relay.watermark(), 7);

        store
            .append(&DeliveryRecord {
                text: "nine".into(),
                chat_id: 1,
                ts: 9,
            })
            .await
            .unwrap();
        // Process dies here; relay is dropped with watermark still 7.
    }

    // Second process: watermark comes back as 9 straight from the store,
    // and a replayed batch containing ts<=9 produces no sends at all.
    let transport = Arc::new(ScriptedTransport::new(vec![batch(&[
        (1, 5, "five"),
        (1, 7, "seven"),
        (1, 9, "nine"),
    ])]));
    let (mut relay, store) = relay_over(&path, Arc::clone(&transport)).await;
    assert_eq!(relay.watermark(), 9);

    relay.run_cycle().await.unwrap();
    assert!(transport.sent().is_empty());
    assert_eq!(store.recent(10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn restart_resumes_past_recorded_work_and_relays_only_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.db");

    {
        let transport = Arc::new(ScriptedTransport::new(vec![batch(&[
            (1, 5, "five"),
            (1, 7, "seven"),
        ])]));
        let (mut relay, _store) = relay_over(&path, transport).await;
        relay.run_cycle().await.unwrap();
    }

    // Restarted process sees an overlapping batch with one new message.
    let transport = Arc::new(ScriptedTransport::new(vec![batch(&[
        (1, 7, "seven"),
        (2, 12, "fresh"),
    ])]));
    let (mut relay, store) = relay_over(&path, Arc::clone(&transport)).await;
    assert_eq!(relay.watermark(), 7);

    relay.run_cycle().await.unwrap();
    assert_eq!(relay.watermark(), 12);
    assert_eq!(transport.sent(), vec![(2, "fresh".to_string())]);

    let ts: Vec<i64> = store.recent(10).await.unwrap().iter().map(|r| r.ts).collect();
    assert_eq!(ts, vec![5, 7, 12]);
}
