//! Export dispatch: downloads, custom delivery and ignored messages

use mockup_bridge::platform::{FetchResponse, MemoryPlatform};
use mockup_bridge::{
    result_channel, Bridge, BridgeOptions, InitConfig, MessageEvent, MessageOutcome, Mode,
    OriginPolicy, ResultSink,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const FRAME_SRC: &str = "https://editor.example/embed";
const FRAME_ORIGIN: &str = "https://editor.example";

fn two_exports() -> Value {
    json!({
        "mockupsExport": [
            { "export_label": "A", "export_path": "https://x/1.webp" },
            { "export_label": "B", "export_path": "https://x/2.webp" }
        ]
    })
}

fn download_bridge(p: &Arc<MemoryPlatform>) -> Bridge<MemoryPlatform> {
    Bridge::initialize(
        p.clone(),
        "editor",
        InitConfig::new("k"),
        Mode::Download,
        None,
        BridgeOptions::default(),
    )
    .expect("frame exists")
}

#[tokio::test]
async fn test_download_labels_follow_position_not_export_label() {
    let p = Arc::new(
        MemoryPlatform::new()
            .with_frame("editor", FRAME_SRC)
            .with_response("https://x/1.webp", FetchResponse::ok(b"one".to_vec()))
            .with_response("https://x/2.webp", FetchResponse::ok(b"two".to_vec())),
    );
    let bridge = download_bridge(&p);

    let outcome = bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, two_exports()))
        .await;

    let report = match outcome {
        MessageOutcome::Downloaded(report) => report,
        other => panic!("expected downloads, got {:?}", other),
    };
    assert!(report.failed.is_empty());

    let mut downloads = p.downloads();
    downloads.sort_by(|a, b| a.filename.cmp(&b.filename));
    assert_eq!(downloads.len(), 2);
    assert_eq!(downloads[0].filename, "Variation 1.webp");
    assert_eq!(downloads[0].blob.bytes, b"one");
    assert_eq!(downloads[1].filename, "Variation 2.webp");
    assert_eq!(downloads[1].blob.bytes, b"two");
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_other_downloads() {
    let p = Arc::new(
        MemoryPlatform::new()
            .with_frame("editor", FRAME_SRC)
            .with_response("https://x/1.webp", FetchResponse::status(404))
            .with_response("https://x/2.webp", FetchResponse::ok(b"two".to_vec())),
    );
    let bridge = download_bridge(&p);

    let outcome = bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, two_exports()))
        .await;

    match outcome {
        MessageOutcome::Downloaded(report) => {
            assert_eq!(report.failed, vec![0]);
            assert_eq!(report.saved, vec![(1, "Variation 2.webp".to_string())]);
        }
        other => panic!("expected downloads, got {:?}", other),
    }
    let downloads = p.downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].filename, "Variation 2.webp");
    assert_eq!(p.fetched().len(), 2);
}

#[tokio::test]
async fn test_network_errors_are_per_entry() {
    // Only the second URL is routed; the first fails at the network level.
    let p = Arc::new(
        MemoryPlatform::new()
            .with_frame("editor", FRAME_SRC)
            .with_response("https://x/2.webp", FetchResponse::ok(b"two".to_vec())),
    );
    let bridge = download_bridge(&p);
    bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, two_exports()))
        .await;
    assert_eq!(p.downloads().len(), 1);
}

#[tokio::test]
async fn test_custom_callback_gets_payload_unmodified() {
    let p = Arc::new(MemoryPlatform::new().with_frame("editor", FRAME_SRC));
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = seen.clone();
        ResultSink::callback(move |result| {
            seen.lock().unwrap().push(result.as_value().clone());
        })
    };
    let bridge = Bridge::initialize(
        p.clone(),
        "editor",
        InitConfig::new("k"),
        Mode::Custom,
        Some(sink),
        BridgeOptions::default(),
    )
    .unwrap();

    let mut data = two_exports();
    data["customFields"] = json!("order-42");
    data["artworks"] = json!([{ "smartObjectUUID": "so-1", "fileBase64": "aGk=" }]);

    let outcome = bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, data.clone()))
        .await;
    assert_eq!(outcome, MessageOutcome::Delivered);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["customFields"], "order-42");
    assert_eq!(seen[0], data);
    assert!(p.fetched().is_empty(), "custom mode never fetches");
}

#[tokio::test]
async fn test_custom_channel_receives_each_export() {
    let p = Arc::new(MemoryPlatform::new().with_frame("editor", FRAME_SRC));
    let (tx, mut rx) = result_channel(8);
    let bridge = Bridge::initialize(
        p.clone(),
        "editor",
        InitConfig::new("k"),
        Mode::Custom,
        Some(ResultSink::Channel(tx)),
        BridgeOptions::default(),
    )
    .unwrap();

    for tag in ["first", "second"] {
        let mut data = two_exports();
        data["customFields"] = json!(tag);
        bridge
            .handle_message(MessageEvent::new(FRAME_ORIGIN, data))
            .await;
    }

    let first = rx.recv().await.unwrap();
    assert_eq!(first.custom_fields(), Some(&json!("first")));
    assert_eq!(first.mockups_export()[1].export_label, Some("B"));
    let second = rx.recv().await.unwrap();
    assert_eq!(second.custom_fields(), Some(&json!("second")));
}

fn editor_payload() -> Value {
    json!({
        "mockupsExport": [
            { "export_label": "Front", "export_path": "https://x/1.webp", "mockup_uuid": "m-1" },
            { "export_label": "Back", "export_path": "https://x/2.webp", "thumbnail": null }
        ],
        "customFields": { "order": 42, "tags": ["a", "b"] },
        "artworks": [
            {
                "smartObjectUUID": "so-1",
                "url": "https://cdn.example/art.png",
                "configData": { "width": 100, "height": 50 }
            },
            { "smartObjectUUID": "so-2", "file": { "name": "art.psd", "size": 1024 } }
        ],
        "collectionId": 7
    })
}

#[tokio::test]
async fn test_custom_sink_sees_the_exact_editor_payload() {
    let p = Arc::new(MemoryPlatform::new().with_frame("editor", FRAME_SRC));
    let (tx, mut rx) = result_channel(1);
    let bridge = Bridge::initialize(
        p.clone(),
        "editor",
        InitConfig::new("k"),
        Mode::Custom,
        Some(ResultSink::Channel(tx)),
        BridgeOptions::default(),
    )
    .unwrap();

    let data = editor_payload();
    let outcome = bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, data.clone()))
        .await;
    assert_eq!(outcome, MessageOutcome::Delivered);

    let result = rx.recv().await.unwrap();
    assert_eq!(result.as_value(), &data);
    assert_eq!(serde_json::to_value(&result).unwrap(), data);
    // integers stay integers, extra entry keys stay put
    assert_eq!(result.as_value()["artworks"][0]["configData"]["height"], json!(50));
    assert_eq!(result.mockups_export()[0].raw["mockup_uuid"], "m-1");
    assert_eq!(result.custom_fields(), Some(&json!({ "order": 42, "tags": ["a", "b"] })));
}

#[tokio::test]
async fn test_partial_artworks_do_not_block_downloads() {
    let p = Arc::new(
        MemoryPlatform::new()
            .with_frame("editor", FRAME_SRC)
            .with_response("https://x/1.webp", FetchResponse::ok(b"one".to_vec()))
            .with_response("https://x/2.webp", FetchResponse::ok(b"two".to_vec())),
    );
    let bridge = download_bridge(&p);

    let mut data = editor_payload();
    data["artworks"] = json!([{ "configData": { "width": 10 } }, "not an artwork"]);
    let outcome = bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, data))
        .await;

    match outcome {
        MessageOutcome::Downloaded(report) => {
            assert!(report.failed.is_empty());
            assert_eq!(report.saved.len(), 2);
        }
        other => panic!("expected downloads, got {:?}", other),
    }
    assert_eq!(p.downloads().len(), 2);
}

#[tokio::test]
async fn test_custom_mode_without_sink_drops_silently() {
    let p = Arc::new(MemoryPlatform::new().with_frame("editor", FRAME_SRC));
    let bridge = Bridge::initialize(
        p.clone(),
        "editor",
        InitConfig::new("k"),
        Mode::Custom,
        None,
        BridgeOptions::default(),
    )
    .unwrap();
    let outcome = bridge
        .handle_message(MessageEvent::new(FRAME_ORIGIN, two_exports()))
        .await;
    assert_eq!(outcome, MessageOutcome::Dropped);
    assert!(p.fetched().is_empty());
    assert!(p.downloads().is_empty());
}

#[tokio::test]
async fn test_messages_without_exports_do_nothing_in_any_mode() {
    let others = [
        json!({ "type": "editor-ready" }),
        json!({ "customFields": "order-42" }),
        json!({ "mockupsExport": [] }),
        json!("mockupsExport"),
        Value::Null,
    ];

    for mode in [Mode::Download, Mode::Custom] {
        let p = Arc::new(MemoryPlatform::new().with_frame("editor", FRAME_SRC));
        let calls = Arc::new(Mutex::new(0usize));
        let sink = {
            let calls = calls.clone();
            ResultSink::callback(move |_| *calls.lock().unwrap() += 1)
        };
        let bridge = Bridge::initialize(
            p.clone(),
            "editor",
            InitConfig::new("k"),
            mode,
            Some(sink),
            BridgeOptions::default(),
        )
        .unwrap();

        for data in others.iter().cloned() {
            let outcome = bridge
                .handle_message(MessageEvent::new(FRAME_ORIGIN, data))
                .await;
            assert_eq!(outcome, MessageOutcome::Ignored);
        }
        assert_eq!(*calls.lock().unwrap(), 0, "mode {}", mode);
        assert!(p.fetched().is_empty(), "mode {}", mode);
        assert!(p.downloads().is_empty(), "mode {}", mode);
    }
}

#[tokio::test]
async fn test_any_origin_policy_accepts_foreign_senders() {
    let p = Arc::new(
        MemoryPlatform::new()
            .with_frame("editor", FRAME_SRC)
            .with_response("https://x/1.webp", FetchResponse::ok(b"one".to_vec()))
            .with_response("https://x/2.webp", FetchResponse::ok(b"two".to_vec())),
    );
    let strict = download_bridge(&p);
    let rejected = strict
        .handle_message(MessageEvent::new("https://other.example", two_exports()))
        .await;
    assert_eq!(rejected, MessageOutcome::Rejected);

    let permissive = Bridge::initialize(
        p.clone(),
        "editor",
        InitConfig::new("k"),
        Mode::Download,
        None,
        BridgeOptions {
            origin_policy: OriginPolicy::Any,
            ..Default::default()
        },
    )
    .unwrap();
    let accepted = permissive
        .handle_message(MessageEvent::new("https://other.example", two_exports()))
        .await;
    assert!(matches!(accepted, MessageOutcome::Downloaded(_)));
    assert_eq!(p.downloads().len(), 2);
}
