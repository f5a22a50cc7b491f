mod common;

use gallery_core::{DownloadState, PaginationReport, PaginationState, Response, SenderContext};
use gallery_engine::Dispatch;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use common::{wait_until, Harness};

const OWNER: u32 = 7;

enum Reply {
    Silent,
    Now(Value),
    Later(JoinHandle<Response>),
}

impl Reply {
    fn now(self) -> Value {
        match self {
            Reply::Now(value) => value,
            Reply::Silent => panic!("expected a reply"),
            Reply::Later(_) => panic!("expected an inline reply"),
        }
    }
}

/// Deliver one message the way the stdio host does: inline replies finish
/// before the next message is read, detached ones run in the background.
async fn deliver(harness: &Harness, raw: Value, sender: SenderContext) -> Reply {
    let to_value = |response: Response| serde_json::to_value(response).unwrap();
    match harness.router.dispatch_raw(raw, sender) {
        Dispatch::Ignored => Reply::Silent,
        Dispatch::Ready(response) => Reply::Now(to_value(response)),
        Dispatch::Pending(future) => Reply::Now(to_value(future.await)),
        Dispatch::Detached(future) => Reply::Later(tokio::spawn(future)),
    }
}

#[tokio::test]
async fn start_then_progress_report_from_owner_apply_in_order() {
    let harness = Harness::new();
    let owner = SenderContext::from_tab(OWNER);
    deliver(&harness, json!({"type": "init"}), owner).await;
    harness.state.update_pagination_status(&PaginationReport {
        state: None,
        current_page: Some(9),
        error: None,
    });

    let start = deliver(&harness, json!({"type": "pagination-start"}), owner).await;
    let report = deliver(
        &harness,
        json!({"type": "pagination-status", "data": {"state": "running", "currentPage": 1}}),
        owner,
    )
    .await;

    assert_eq!(start.now(), json!({"success": true}));
    assert_eq!(report.now(), json!({"success": true}));
    let status = harness.state.pagination_status();
    assert_eq!(status.state, PaginationState::Running);
    assert_eq!(status.current_page, 1);
}

#[tokio::test]
async fn settings_update_is_visible_to_the_next_get() {
    let harness = Harness::new();
    let ui = SenderContext::ui();

    deliver(
        &harness,
        json!({"type": "settings-update", "settings": {"folder": "x"}}),
        ui,
    )
    .await;
    let get = deliver(&harness, json!({"type": "settings-get"}), ui).await;

    assert_eq!(get.now(), json!({"success": true, "settings": {"folder": "x"}}));
}

#[tokio::test]
async fn parked_download_does_not_hold_up_later_messages() {
    let harness = Harness::new();
    let ui = SenderContext::ui();

    let Reply::Later(job) = deliver(
        &harness,
        json!({"type": "download-start", "images": [
            {"url": "https://img.example.com/1.jpg"},
            {"url": "https://img.example.com/2.jpg"},
            {"url": "https://img.example.com/3.jpg"},
            {"url": "https://img.example.com/4.jpg"}
        ]}),
        ui,
    )
    .await
    else {
        panic!("download-start should run in the background");
    };

    // The job slot is claimed before the next message is read.
    let status = deliver(&harness, json!({"type": "get-status"}), ui).await.now();
    assert_eq!(status["downloads"]["state"], json!("downloading"));
    assert_eq!(status["downloads"]["progress"]["total"], json!(4));

    wait_until(|| harness.downloads.status().state == DownloadState::AwaitingConfirmation).await;
    let decision = deliver(
        &harness,
        json!({"type": "download/batch-response", "continue": true}),
        ui,
    )
    .await;
    assert_eq!(decision.now(), json!({"success": true}));

    let done = job.await.unwrap();
    assert!(done.success);
    assert_eq!(harness.files.requests().len(), 4);
}
