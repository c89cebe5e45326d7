use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::process::{Child, Command};
use tracing::Level;

use taskexec::io::{AttachedStreams, IoAttachment, ProcessIo, StreamContext};
use taskexec::logger::TaskLogger;

/// I/O attachment that delegates to a `ProcessIo` and counts each call.
#[derive(Debug)]
pub struct CountingIo {
    inner: ProcessIo,
    attaches: AtomicUsize,
    connects: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingIo {
    pub fn new(inner: ProcessIo) -> Arc<Self> {
        Arc::new(Self {
            inner,
            attaches: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        })
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl IoAttachment for CountingIo {
    fn attach(&self, cmd: &mut Command) -> std::io::Result<()> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.inner.attach(cmd)
    }

    fn connect(&self, child: &mut Child, ctx: &StreamContext) -> AttachedStreams {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect(child, ctx)
    }

    fn release(&self, streams: AttachedStreams) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(streams)
    }

    fn shares_terminal(&self) -> bool {
        self.inner.shares_terminal()
    }
}

/// Logger that keeps every message it receives.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|(_, msg)| msg.contains(needle))
    }
}

impl TaskLogger for RecordingLogger {
    fn log(&self, level: Level, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

/// Logger that panics on every call.
#[derive(Debug, Default)]
pub struct PanickingLogger;

impl TaskLogger for PanickingLogger {
    fn log(&self, _level: Level, message: &str) {
        panic!("logger exploded on: {message}");
    }
}
