// Lifecycle tests for the save session state machine, driven through a fake host.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use common::{HostCall, MockHost};
use savekit::config::{SaverConfig, UTF8_BOM};
use savekit::{HostCaps, SaveError, SaveOptions, Saver, SaveStatus};

fn native_caps() -> HostCaps {
    HostCaps {
        native_save: true,
        ..HostCaps::default()
    }
}

#[tokio::test]
async fn test_save_runs_hooks_in_phase_order() {
    common::init_tracing();

    let events: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let push = |name: &'static str| {
        let events = Arc::clone(&events);
        move || events.lock().push(name)
    };

    let (before, start, end, after, error) = (
        push("before"),
        push("start"),
        push("end"),
        push("after"),
        push("error"),
    );
    let options = SaveOptions::new()
        .on_before_save(move |_| before())
        .on_start_save(move |_| start())
        .on_end_save(move |_| end())
        .on_after_save(move |_| after())
        .on_error(move |_| error());

    let host = Arc::new(MockHost::new(native_caps()));
    let saver = Saver::new(host.clone(), "notes.txt", options);
    let session = saver.session("hello world");

    assert_eq!(session.status(), SaveStatus::Pending);

    let handle = session.save().await.unwrap();
    assert!(!handle.is_empty());
    assert_eq!(session.status(), SaveStatus::Complete);
    assert_eq!(session.size(), 11);
    assert_eq!(session.error(), None);
    assert_eq!(*events.lock(), vec!["before", "start", "end", "after"]);
}

#[tokio::test]
async fn test_second_save_rejects_without_rerunning_phases() {
    let events: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let options = {
        let start_events = Arc::clone(&events);
        let error_events = Arc::clone(&events);
        SaveOptions::new()
            .on_start_save(move |_| start_events.lock().push("start"))
            .on_error(move |_| error_events.lock().push("error"))
    };

    let host = Arc::new(MockHost::new(native_caps()));
    let session = Saver::new(host.clone(), "once.txt", options).session("data");

    session.save().await.unwrap();
    let url_allocations = host
        .calls()
        .iter()
        .filter(|c| matches!(c, HostCall::CreateUrl(_)))
        .count();
    assert_eq!(url_allocations, 1);

    let err = session.save().await.unwrap_err();
    assert!(matches!(err, SaveError::PhaseOutOfOrder { .. }));

    // No phase re-ran: one start hook, one url allocation, plus the error hook.
    assert_eq!(*events.lock(), vec!["start", "error"]);
    let url_allocations = host
        .calls()
        .iter()
        .filter(|c| matches!(c, HostCall::CreateUrl(_)))
        .count();
    assert_eq!(url_allocations, 1);
}

#[tokio::test]
async fn test_abort_pending_session() {
    let aborted = Arc::new(Mutex::new(0u32));
    let options = {
        let aborted = Arc::clone(&aborted);
        SaveOptions::new().on_abort(move |_| *aborted.lock() += 1)
    };

    let host = Arc::new(MockHost::new(native_caps()));
    let session = Saver::new(host.clone(), "doomed.txt", options).session("data");

    let result = session.abort();
    assert!(result.is_ok());
    assert_eq!(session.status(), SaveStatus::Cancelled);
    assert_eq!(
        session.error(),
        Some(SaveError::Aborted("doomed.txt".into()))
    );
    assert_eq!(*aborted.lock(), 1);

    // A save after abort rejects with the abort error and stays cancelled.
    let err = session.save().await.unwrap_err();
    assert_eq!(err, SaveError::Aborted("doomed.txt".into()));
    assert_eq!(session.status(), SaveStatus::Cancelled);
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_abort_from_start_hook_halts_at_next_phase() {
    let options = SaveOptions::new().on_start_save(|session| {
        let _ = session.abort();
    });

    let host = Arc::new(MockHost::new(native_caps()));
    let session = Saver::new(host.clone(), "midflight.txt", options).session("data");

    let err = session.save().await.unwrap_err();
    assert_eq!(err, SaveError::Aborted("midflight.txt".into()));
    assert_eq!(session.status(), SaveStatus::Cancelled);

    // Cancelled before create-output: no url was ever allocated.
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_abort_during_async_delivery_suppresses_it() {
    let caps = HostCaps {
        data_uri_reader: true,
        ..HostCaps::default()
    };
    let host = Arc::new(MockHost::new(caps));
    let session = Arc::new(Saver::new(host.clone(), "late.txt", SaveOptions::new()).session("data"));

    host.set_on_read({
        let session = Arc::clone(&session);
        move || {
            let _ = session.abort();
        }
    });

    let err = session.save().await.unwrap_err();
    assert_eq!(err, SaveError::Aborted("late.txt".into()));
    assert_eq!(session.status(), SaveStatus::Cancelled);

    // The read happened, but delivery was suppressed afterwards.
    let calls = host.calls();
    assert!(calls.contains(&HostCall::ReadDataUri));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, HostCall::OpenWindow(_) | HostCall::Navigate(_))));
}

#[tokio::test]
async fn test_abort_on_terminal_session_rejects() {
    let host = Arc::new(MockHost::new(native_caps()));
    let session = Saver::new(host.clone(), "done.txt", SaveOptions::new()).session("data");

    session.save().await.unwrap();
    assert_eq!(session.status(), SaveStatus::Complete);

    let err = session.abort().unwrap_err();
    assert_eq!(err, SaveError::AlreadyFinished("done.txt".into()));
    assert_eq!(session.status(), SaveStatus::Complete);
}

#[tokio::test]
async fn test_double_abort_rejects() {
    let host = Arc::new(MockHost::new(native_caps()));
    let session = Saver::new(host.clone(), "twice.txt", SaveOptions::new()).session("data");

    session.abort().unwrap();
    let err = session.abort().unwrap_err();
    assert_eq!(err, SaveError::AlreadyFinished("twice.txt".into()));
    assert_eq!(session.status(), SaveStatus::Cancelled);
}

#[tokio::test]
async fn test_auto_bom_for_utf8_text() {
    let host = Arc::new(MockHost::new(native_caps()));
    let options = SaveOptions::new().mime_type("text/html;charset=utf-8");
    let session = Saver::new(host.clone(), "page.html", options).session("<html></html>");

    session.save().await.unwrap();

    let blob = host.last_blob().unwrap();
    assert_eq!(&blob.data[..3], &UTF8_BOM);
    assert_eq!(&blob.data[3..], b"<html></html>");
    // Size excludes the prepended marker.
    assert_eq!(session.size(), 13);
}

#[tokio::test]
async fn test_no_bom_for_binary_payloads() {
    let host = Arc::new(MockHost::new(native_caps()));
    let session = Saver::new(host.clone(), "img.png", SaveOptions::new()).session("fakepng");

    session.save().await.unwrap();

    let blob = host.last_blob().unwrap();
    assert_eq!(&blob.data[..], b"fakepng");
}

#[tokio::test]
async fn test_auto_bom_can_be_disabled() {
    let host = Arc::new(MockHost::new(native_caps()));
    let options = SaveOptions::new()
        .mime_type("text/html;charset=utf-8")
        .auto_bom(false);
    let session = Saver::new(host.clone(), "page.html", options).session("<p>");

    session.save().await.unwrap();
    assert_eq!(&host.last_blob().unwrap().data[..], b"<p>");
}

#[tokio::test]
async fn test_object_url_revoked_after_grace_delay() {
    let host = Arc::new(MockHost::new(native_caps()));
    let config = SaverConfig { revoke_grace_ms: 50 };
    let saver = Saver::with_config(host.clone(), "graced.txt", SaveOptions::new(), config);

    saver.session("data").save().await.unwrap();

    // Not revoked before the grace delay elapses.
    let calls = host.calls();
    assert!(!calls.iter().any(|c| matches!(c, HostCall::RevokeUrl(_))));

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Revoked after, and only after delivery had happened.
    let calls = host.calls();
    let deliver_at = calls
        .iter()
        .position(|c| matches!(c, HostCall::SaveBlob(_)))
        .unwrap();
    let revoke_at = calls
        .iter()
        .position(|c| matches!(c, HostCall::RevokeUrl(_)))
        .unwrap();
    assert!(revoke_at > deliver_at);
}

#[tokio::test]
async fn test_one_shot_save() {
    let captured: Arc<Mutex<Option<(SaveStatus, u64)>>> = Arc::new(Mutex::new(None));
    let options = {
        let captured = Arc::clone(&captured);
        SaveOptions::new()
            .on_end_save(move |session| *captured.lock() = Some((session.status(), session.size())))
    };

    let host = Arc::new(MockHost::new(native_caps()));
    let handle = savekit::save(host, "hello", "greeting.txt", options)
        .await
        .unwrap();

    assert!(!handle.is_empty());
    assert_eq!(*captured.lock(), Some((SaveStatus::Complete, 5)));
}

#[tokio::test]
async fn test_empty_filename_uses_default() {
    let host = Arc::new(MockHost::new(native_caps()));
    let saver = Saver::new(host.clone(), "", SaveOptions::new());
    let session = saver.session("data");

    assert_eq!(session.filename(), "download.txt");
    // download.txt resolves through the table, not the generic default.
    assert_eq!(session.mime_type(), "text/plain");
}

#[tokio::test]
async fn test_empty_payload_on_reader_host_errors() {
    let caps = HostCaps {
        data_uri_reader: true,
        ..HostCaps::default()
    };
    let host = Arc::new(MockHost::new(caps));
    let session = Saver::new(host.clone(), "empty.txt", SaveOptions::new()).session("");

    let err = session.save().await.unwrap_err();
    assert_eq!(err, SaveError::EmptyPayload);
    assert_eq!(session.status(), SaveStatus::Error);
    assert_eq!(session.error(), Some(SaveError::EmptyPayload));
}
