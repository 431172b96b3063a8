// ABOUTME: Integration tests for the Amber clipboard handshake
// ABOUTME: Drives the poll/timeout race with scripted fakes under paused tokio time

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nostr_sdk::prelude::*;

use agora_signer::amber::{AmberSigner, POLL_INTERVAL, SIGNING_TIMEOUT};
use agora_signer::host::{ClipboardChannel, HostError, HostWindow};
use agora_signer::signing::{EventSigner, SignerError};

/// Clipboard fake: a single slot plus counters, optionally failing the
/// first N reads to simulate transient access denials.
struct FakeClipboard {
    slot: Mutex<String>,
    reads: AtomicUsize,
    failing_reads: AtomicUsize,
    writes: Mutex<Vec<String>>,
}

impl FakeClipboard {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(String::new()),
            reads: AtomicUsize::new(0),
            failing_reads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        })
    }

    fn set(&self, value: &str) {
        *self.slot.lock().unwrap() = value.to_string();
    }

    fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipboardChannel for FakeClipboard {
    async fn write(&self, text: &str) -> Result<(), HostError> {
        self.writes.lock().unwrap().push(text.to_string());
        *self.slot.lock().unwrap() = text.to_string();
        Ok(())
    }

    async fn read(&self) -> Result<String, HostError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_reads.store(remaining - 1, Ordering::SeqCst);
            return Err(HostError::Clipboard("access denied".to_string()));
        }
        Ok(self.slot.lock().unwrap().clone())
    }
}

struct FakeWindow {
    focused: AtomicBool,
    opened: Mutex<Vec<String>>,
}

impl FakeWindow {
    fn new(focused: bool) -> Arc<Self> {
        Arc::new(Self {
            focused: AtomicBool::new(focused),
            opened: Mutex::new(Vec::new()),
        })
    }

    fn set_focus(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostWindow for FakeWindow {
    fn has_focus(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    async fn open(&self, uri: &str) -> Result<(), HostError> {
        self.opened.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}

fn unsigned_note(keys: &Keys) -> UnsignedEvent {
    UnsignedEvent::new(
        keys.public_key(),
        Timestamp::now(),
        Kind::TextNote,
        vec![],
        "ahoy",
    )
}

async fn signed_note(keys: &Keys) -> Event {
    EventBuilder::new(Kind::TextNote, "ahoy")
        .sign(keys)
        .await
        .unwrap()
}

/// The signer app's payload is consumed as plain JSON even though the deep
/// link advertises `compressionType=gzip`; nothing is ever decompressed.
/// Known discrepancy carried over from the observed client behavior.
#[tokio::test(start_paused = true)]
async fn test_handshake_resolves_on_clipboard_payload() {
    let keys = Keys::generate();
    let clipboard = FakeClipboard::new();
    let window = FakeWindow::new(true);
    let signer = AmberSigner::new(clipboard.clone(), window.clone());

    let signed = signed_note(&keys).await;
    let payload = serde_json::to_string(&signed).unwrap();

    let writer = clipboard.clone();
    tokio::spawn(async move {
        tokio::time::sleep(POLL_INTERVAL * 3).await;
        writer.set(&payload);
    });

    let event = signer.sign_event(unsigned_note(&keys)).await.unwrap();
    assert_eq!(event.id, signed.id);

    // The channel was armed with an empty write before the deep link opened
    assert_eq!(clipboard.writes().first().map(String::as_str), Some(""));
    let opened = window.opened();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].starts_with("nostrsigner:"));
    assert!(opened[0].contains("type=sign_event"));
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_once_resolved() {
    let keys = Keys::generate();
    let clipboard = FakeClipboard::new();
    let window = FakeWindow::new(true);
    let signer = AmberSigner::new(clipboard.clone(), window.clone());

    let signed = signed_note(&keys).await;
    let writer = clipboard.clone();
    let payload = serde_json::to_string(&signed).unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(POLL_INTERVAL).await;
        writer.set(&payload);
    });

    signer.sign_event(unsigned_note(&keys)).await.unwrap();

    let reads_at_resolution = clipboard.read_count();
    tokio::time::sleep(POLL_INTERVAL * 10).await;
    assert_eq!(clipboard.read_count(), reads_at_resolution);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_times_out_without_payload() {
    let keys = Keys::generate();
    let clipboard = FakeClipboard::new();
    let window = FakeWindow::new(true);
    let signer = AmberSigner::new(clipboard.clone(), window.clone());

    let started = tokio::time::Instant::now();
    let err = signer.sign_event(unsigned_note(&keys)).await.unwrap_err();

    assert!(matches!(err, SignerError::Timeout));
    assert!(err.to_string().contains("Amber signing timed out"));
    assert!(started.elapsed() >= SIGNING_TIMEOUT);

    // Cancellation is cooperative: the poller exits without touching the
    // clipboard again
    tokio::time::sleep(POLL_INTERVAL * 2).await;
    let reads_after_timeout = clipboard.read_count();
    tokio::time::sleep(POLL_INTERVAL * 10).await;
    assert_eq!(clipboard.read_count(), reads_after_timeout);
}

#[tokio::test(start_paused = true)]
async fn test_polling_skips_cycles_without_focus() {
    let keys = Keys::generate();
    let clipboard = FakeClipboard::new();
    let window = FakeWindow::new(false);
    let signer = AmberSigner::new(clipboard.clone(), window.clone());

    let signed = signed_note(&keys).await;
    let payload = serde_json::to_string(&signed).unwrap();

    let unsigned = unsigned_note(&keys);
    let task = tokio::spawn(async move { signer.sign_event(unsigned).await });

    tokio::time::sleep(POLL_INTERVAL * 3).await;
    clipboard.set(&payload);
    tokio::time::sleep(POLL_INTERVAL * 5).await;

    // Content is sitting on the clipboard, but unfocused cycles never read
    assert_eq!(clipboard.read_count(), 0);

    window.set_focus(true);
    let event = task.await.unwrap().unwrap();
    assert_eq!(event.id, signed.id);
    assert!(clipboard.read_count() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_clipboard_read_errors_are_tolerated() {
    let keys = Keys::generate();
    let clipboard = FakeClipboard::new();
    let window = FakeWindow::new(true);
    let signer = AmberSigner::new(clipboard.clone(), window.clone());

    let signed = signed_note(&keys).await;
    let payload = serde_json::to_string(&signed).unwrap();
    clipboard.fail_next_reads(3);
    let writer = clipboard.clone();
    tokio::spawn(async move {
        tokio::time::sleep(POLL_INTERVAL).await;
        writer.set(&payload);
    });

    let event = signer.sign_event(unsigned_note(&keys)).await.unwrap();
    assert_eq!(event.id, signed.id);
    assert!(clipboard.read_count() > 3);
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_payload_runs_out_the_deadline() {
    let keys = Keys::generate();
    let clipboard = FakeClipboard::new();
    let window = FakeWindow::new(true);
    let signer = AmberSigner::new(clipboard.clone(), window.clone());

    let writer = clipboard.clone();
    tokio::spawn(async move {
        tokio::time::sleep(POLL_INTERVAL).await;
        writer.set("definitely not an event");
    });

    let started = tokio::time::Instant::now();
    let err = signer.sign_event(unsigned_note(&keys)).await.unwrap_err();
    assert!(matches!(err, SignerError::Timeout));
    assert!(started.elapsed() >= SIGNING_TIMEOUT);
}
