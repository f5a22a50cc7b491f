mod common;

use std::sync::Arc;

use gallery_core::{DownloadOptions, DownloadState, IconStatus, UiEvent};
use gallery_engine::DownloadError;
use pretty_assertions::assert_eq;

use common::{items, wait_until, Harness};

fn seven_items() -> Vec<gallery_core::Item> {
    items(&[
        "https://img.example.com/1.jpg",
        "https://img.example.com/2.jpg",
        "https://img.example.com/3.jpg",
        "https://img.example.com/4.jpg",
        "https://img.example.com/5.jpg",
        "https://img.example.com/6.jpg",
        "https://img.example.com/7.jpg",
    ])
}

fn awaiting(harness: &Harness) -> impl Fn() -> bool + '_ {
    move || harness.downloads.status().state == DownloadState::AwaitingConfirmation
}

#[tokio::test]
async fn batches_wait_for_confirmation_then_complete() {
    let harness = Harness::new();
    let downloads = Arc::clone(&harness.downloads);
    let job = tokio::spawn(async move {
        downloads
            .download_images(seven_items(), DownloadOptions::default())
            .await
    });

    wait_until(awaiting(&harness)).await;
    let status = harness.downloads.status();
    assert_eq!(status.progress.downloaded, 3);
    assert_eq!(status.progress.batch, 1);
    assert_eq!(harness.files.requests().len(), 3);

    harness.downloads.resume_downloads(true).unwrap();
    assert_eq!(harness.downloads.status().state, DownloadState::Downloading);
    wait_until(|| harness.downloads.status().progress.downloaded == 6).await;
    wait_until(awaiting(&harness)).await;

    harness.downloads.resume_downloads(true).unwrap();
    let status = job.await.unwrap().unwrap();

    assert_eq!(status.state, DownloadState::Complete);
    assert_eq!(status.progress.downloaded, 7);
    assert_eq!(status.progress.batch, 3);
    assert_eq!(harness.icon(), IconStatus::Complete);

    let events = harness.transport.events();
    let page_completes = events
        .iter()
        .filter(|event| matches!(event, UiEvent::DownloadPageComplete { .. }))
        .count();
    assert_eq!(page_completes, 2);
    assert!(matches!(events.last(), Some(UiEvent::DownloadComplete { .. })));
}

#[tokio::test]
async fn stopping_after_first_batch_keeps_remaining_items_untouched() {
    let harness = Harness::new();
    let downloads = Arc::clone(&harness.downloads);
    let job = tokio::spawn(async move {
        downloads
            .download_images(seven_items(), DownloadOptions::default())
            .await
    });

    wait_until(awaiting(&harness)).await;
    harness.downloads.resume_downloads(false).unwrap();
    let status = job.await.unwrap().unwrap();

    assert_eq!(status.state, DownloadState::Stopped);
    assert_eq!(status.progress.downloaded, 3);
    assert_eq!(status.progress.remaining(), 4);
    assert_eq!(harness.files.requests().len(), 3);
    assert_eq!(harness.icon(), IconStatus::Idle);
    assert!(matches!(
        harness.transport.events().last(),
        Some(UiEvent::DownloadStopped { .. })
    ));
}

#[tokio::test]
async fn second_job_is_rejected_while_one_is_active() {
    let harness = Harness::new();
    let downloads = Arc::clone(&harness.downloads);
    let job = tokio::spawn(async move {
        downloads
            .download_images(seven_items(), DownloadOptions::default())
            .await
    });
    wait_until(awaiting(&harness)).await;
    let icon_before = harness.icon();
    let events_before = harness.transport.events().len();

    let err = harness
        .downloads
        .download_images(seven_items(), DownloadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DownloadError::AlreadyActive);
    assert_eq!(harness.icon(), icon_before);
    assert_eq!(harness.transport.events().len(), events_before);
    assert_eq!(
        harness.downloads.status().state,
        DownloadState::AwaitingConfirmation
    );

    harness.downloads.resume_downloads(false).unwrap();
    job.await.unwrap().unwrap();
}

#[tokio::test]
async fn stopped_job_holds_the_slot_until_it_has_wound_down() {
    let harness = Harness::new();
    let downloads = Arc::clone(&harness.downloads);
    let first = tokio::spawn(async move {
        downloads
            .download_images(seven_items(), DownloadOptions::default())
            .await
    });
    wait_until(awaiting(&harness)).await;

    harness.downloads.resume_downloads(false).unwrap();
    assert!(harness.downloads.status().state.is_active());
    let err = harness
        .downloads
        .download_images(seven_items()[..4].to_vec(), DownloadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DownloadError::AlreadyActive);

    let stopped = first.await.unwrap().unwrap();
    assert_eq!(stopped.state, DownloadState::Stopped);
    assert_eq!(stopped.progress.total, 7);
    assert_eq!(stopped.progress.downloaded, 3);

    let downloads = Arc::clone(&harness.downloads);
    let second = tokio::spawn(async move {
        downloads
            .download_images(seven_items()[..4].to_vec(), DownloadOptions::default())
            .await
    });
    wait_until(awaiting(&harness)).await;
    let status = harness.downloads.status();
    assert_eq!(status.progress.total, 4);
    assert_eq!(status.progress.downloaded, 3);

    harness.downloads.resume_downloads(true).unwrap();
    let done = second.await.unwrap().unwrap();
    assert_eq!(done.state, DownloadState::Complete);
    assert_eq!(done.progress.downloaded, 4);
}

#[tokio::test]
async fn dropping_a_claimed_job_releases_the_slot_as_failed() {
    let harness = Harness::new();
    let job = harness
        .downloads
        .begin(seven_items(), DownloadOptions::default())
        .unwrap();
    assert_eq!(job.total(), 7);
    assert_eq!(
        harness.icon(),
        IconStatus::Downloading {
            downloaded: 0,
            total: 7
        }
    );
    assert_eq!(
        harness
            .downloads
            .begin(seven_items(), DownloadOptions::default())
            .err(),
        Some(DownloadError::AlreadyActive)
    );

    drop(job);
    assert_eq!(harness.downloads.status().state, DownloadState::Failed);

    let status = harness
        .downloads
        .download_images(seven_items()[..2].to_vec(), DownloadOptions::default())
        .await
        .unwrap();
    assert_eq!(status.state, DownloadState::Complete);
    assert_eq!(status.progress.downloaded, 2);
}

#[tokio::test]
async fn decision_without_parked_job_is_an_error() {
    let harness = Harness::new();
    assert_eq!(
        harness.downloads.resume_downloads(true),
        Err(DownloadError::NoPendingDecision)
    );
}

#[tokio::test]
async fn per_item_failures_are_counted_not_fatal() {
    let harness = Harness::new();
    let list = items(&[
        "https://img.example.com/ok-1.jpg",
        "https://img.example.com/fail.jpg",
        "https://img.example.com/ok-2.jpg",
    ]);

    let status = harness
        .downloads
        .download_images(list, DownloadOptions::default())
        .await
        .unwrap();

    assert_eq!(status.state, DownloadState::Complete);
    assert_eq!(status.progress.downloaded, 2);
    assert_eq!(status.progress.failed, 1);
    assert_eq!(status.failures.len(), 1);
    assert_eq!(status.failures[0].url, "https://img.example.com/fail.jpg");
    assert!(status.failures[0].error.contains("404"));
}

#[tokio::test]
async fn shutdown_while_parked_fails_the_job() {
    let harness = Harness::new();
    let downloads = Arc::clone(&harness.downloads);
    let job = tokio::spawn(async move {
        downloads
            .download_images(seven_items(), DownloadOptions::default())
            .await
    });
    wait_until(awaiting(&harness)).await;

    harness.downloads.shutdown();
    let err = job.await.unwrap().unwrap_err();

    assert_eq!(err, DownloadError::Interrupted);
    assert_eq!(harness.downloads.status().state, DownloadState::Failed);
    assert!(matches!(harness.icon(), IconStatus::Error { .. }));
}

#[tokio::test]
async fn empty_list_completes_immediately() {
    let harness = Harness::new();
    let status = harness
        .downloads
        .download_images(Vec::new(), DownloadOptions::default())
        .await
        .unwrap();
    assert_eq!(status.state, DownloadState::Complete);
    assert_eq!(status.progress.total, 0);
    assert!(harness.files.requests().is_empty());
}

#[tokio::test]
async fn options_control_batch_size_and_folder() {
    let harness = Harness::new();
    let options = DownloadOptions {
        batch_size: Some(10),
        folder: Some("trip".to_string()),
        save_as: false,
    };

    let status = harness
        .downloads
        .download_images(seven_items(), options)
        .await
        .unwrap();

    assert_eq!(status.progress.batch, 1);
    let requests = harness.files.requests();
    assert_eq!(requests[0].filename, "trip/1.jpg");
    assert!(!requests[0].save_as);
}
