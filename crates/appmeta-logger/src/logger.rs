use crate::sink::{emit, LogSink, StdioSink};
use crate::{Level, LogError, LogRecord, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

/// Exit code used by the default fatal action
pub const FATAL_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Records buffered per level before new ones are dropped
    pub mailbox_capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            mailbox_capacity: 1024,
        }
    }
}

/// What happens after a FATAL record has been rendered
#[derive(Clone)]
pub enum FatalAction {
    /// Terminate the process with this exit code
    Exit(i32),
    /// Hand the record to a callback instead of exiting
    Callback(Arc<dyn Fn(&LogRecord) + Send + Sync>),
}

impl FatalAction {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&LogRecord) + Send + Sync + 'static,
    {
        FatalAction::Callback(Arc::new(f))
    }

    fn run(&self, record: &LogRecord) {
        match self {
            FatalAction::Exit(code) => std::process::exit(*code),
            FatalAction::Callback(f) => f(record),
        }
    }
}

impl Default for FatalAction {
    fn default() -> Self {
        FatalAction::Exit(FATAL_EXIT_CODE)
    }
}

impl fmt::Debug for FatalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalAction::Exit(code) => f.debug_tuple("Exit").field(code).finish(),
            FatalAction::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

pub struct LoggerBuilder {
    config: LoggerConfig,
    sink: Arc<dyn LogSink>,
    fatal: FatalAction,
}

impl LoggerBuilder {
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.mailbox_capacity = capacity;
        self
    }

    pub fn sink<S: LogSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn on_fatal(mut self, action: FatalAction) -> Self {
        self.fatal = action;
        self
    }

    /// Create the mailboxes and spawn the consumer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> AsyncLogger {
        let capacity = self.config.mailbox_capacity.max(1);

        let (info_tx, info) = mpsc::channel(capacity);
        let (warning_tx, warning) = mpsc::channel(capacity);
        let (error_tx, error) = mpsc::channel(capacity);
        let (fatal_tx, fatal) = mpsc::channel(capacity);
        let (control_tx, control) = mpsc::channel(1);

        let consumer = Consumer {
            info,
            warning,
            error,
            fatal,
            control,
            sink: self.sink,
            fatal_action: self.fatal,
        };
        let handle = tokio::spawn(consumer.run());

        AsyncLogger {
            inner: Arc::new(Inner {
                mailboxes: [info_tx, warning_tx, error_tx, fatal_tx],
                control: control_tx,
                stopped: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
                consumer: Mutex::new(Some(handle)),
            }),
        }
    }
}

/// Cloneable handle to the logger.
///
/// Logging never blocks the caller: records are placed on the level's
/// mailbox with `try_send`. Records of one level are rendered in the order
/// they were accepted; there is no ordering across levels.
#[derive(Clone)]
pub struct AsyncLogger {
    inner: Arc<Inner>,
}

struct Inner {
    mailboxes: [mpsc::Sender<LogRecord>; 4],
    control: mpsc::Sender<oneshot::Sender<()>>,
    stopped: AtomicBool,
    dropped: AtomicU64,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncLogger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            config: LoggerConfig::default(),
            sink: Arc::new(StdioSink),
            fatal: FatalAction::default(),
        }
    }

    /// Logger writing to stdout/stderr that exits the process on FATAL
    pub fn stdio(config: LoggerConfig) -> Self {
        Self::builder().config(config).start()
    }

    /// Enqueue a record, reporting why it was not accepted
    #[track_caller]
    pub fn try_log<I, S>(&self, level: Level, fragments: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(LogError::Stopped);
        }

        let record = LogRecord::new(
            level,
            fragments.into_iter().map(Into::into).collect(),
            Location::caller(),
        );

        match self.inner.mailboxes[level.index()].try_send(record) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(%level, dropped, "log mailbox full, record dropped");
                Err(LogError::MailboxFull(level))
            }
            Err(TrySendError::Closed(_)) => Err(LogError::Stopped),
        }
    }

    /// Enqueue a record; records that cannot be accepted are counted in
    /// [`AsyncLogger::dropped`] when the mailbox is full
    #[track_caller]
    pub fn log<I, S>(&self, level: Level, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _ = self.try_log(level, fragments);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, [message]);
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, [message]);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, [message]);
    }

    /// Render the message and terminate according to the fatal action
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::Fatal, [message]);
    }

    /// Records dropped because their mailbox was full
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Stop accepting records, render everything already accepted, then end
    /// the consumer task. Returns once the consumer has exited.
    ///
    /// Any `log` call made after `stop` begins fails fast with
    /// [`LogError::Stopped`].
    pub async fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.inner.control.send(ack_tx).await.is_ok() {
            let _ = ack_rx.await;
        }

        let handle = self.inner.consumer.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("log consumer ended abnormally: {}", e);
            }
        }
    }
}

/// The single reader of all four mailboxes
struct Consumer {
    info: mpsc::Receiver<LogRecord>,
    warning: mpsc::Receiver<LogRecord>,
    error: mpsc::Receiver<LogRecord>,
    fatal: mpsc::Receiver<LogRecord>,
    control: mpsc::Receiver<oneshot::Sender<()>>,
    sink: Arc<dyn LogSink>,
    fatal_action: FatalAction,
}

impl Consumer {
    async fn run(mut self) {
        loop {
            tokio::select! {
                Some(record) = self.info.recv() => emit(&*self.sink, &record),
                Some(record) = self.warning.recv() => emit(&*self.sink, &record),
                Some(record) = self.error.recv() => emit(&*self.sink, &record),
                Some(record) = self.fatal.recv() => {
                    self.close();
                    self.terminate(&record);
                    return;
                }
                request = self.control.recv() => {
                    // `None` means every handle is gone; drain the same way.
                    self.close();
                    self.drain().await;
                    if let Some(ack) = request {
                        let _ = ack.send(());
                    }
                    return;
                }
            }
        }
    }

    /// Refuse new records. Sends after this fail with `Stopped`; records
    /// already buffered can still be received.
    fn close(&mut self) {
        self.info.close();
        self.warning.close();
        self.error.close();
        self.fatal.close();
    }

    /// Render what is already buffered, including sends still in flight
    /// when the mailboxes were closed. A buffered FATAL record still
    /// terminates, after the other levels have been rendered.
    async fn drain(&mut self) {
        for mailbox in [&mut self.info, &mut self.warning, &mut self.error] {
            while let Some(record) = mailbox.recv().await {
                emit(&*self.sink, &record);
            }
        }
        self.sink.flush();

        if let Some(record) = self.fatal.recv().await {
            self.terminate(&record);
        }
    }

    fn terminate(&self, record: &LogRecord) {
        emit(&*self.sink, record);
        self.sink.flush();
        self.fatal_action.run(record);
    }
}

/// Log at INFO with fragments of any `Display` type
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($fragment:expr),+ $(,)?) => {
        $logger.log($crate::Level::Info, [$(::std::string::ToString::to_string(&$fragment)),+])
    };
}

/// Log at WARNING with fragments of any `Display` type
#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($fragment:expr),+ $(,)?) => {
        $logger.log($crate::Level::Warning, [$(::std::string::ToString::to_string(&$fragment)),+])
    };
}

/// Log at ERROR with fragments of any `Display` type
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($fragment:expr),+ $(,)?) => {
        $logger.log($crate::Level::Error, [$(::std::string::ToString::to_string(&$fragment)),+])
    };
}

/// Log at FATAL with fragments of any `Display` type
#[macro_export]
macro_rules! log_fatal {
    ($logger:expr, $($fragment:expr),+ $(,)?) => {
        $logger.log($crate::Level::Fatal, [$(::std::string::ToString::to_string(&$fragment)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, Stream};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    fn memory_logger(sink: &MemorySink) -> AsyncLogger {
        AsyncLogger::builder()
            .sink(sink.clone())
            .on_fatal(FatalAction::callback(|_| {}))
            .start()
    }

    #[tokio::test]
    async fn test_renders_levels_to_their_streams() {
        let sink = MemorySink::new();
        let logger = memory_logger(&sink);

        logger.info("started");
        logger.warning("slow");
        logger.error("failed");
        logger.stop().await;

        let primary = sink.stream_lines(Stream::Primary);
        assert_eq!(primary.len(), 3);
        assert!(primary.iter().any(|l| l.starts_with("INFO: ") && l.ends_with(": started")));
        assert!(primary.iter().any(|l| l.starts_with("WARNING: ")));
        assert!(primary.iter().any(|l| l.starts_with("ERROR: ")));
        assert!(sink.stream_lines(Stream::Alternate).is_empty());
    }

    #[tokio::test]
    async fn test_location_is_the_call_site() {
        let sink = MemorySink::new();
        let logger = memory_logger(&sink);

        log_info!(logger, "Work ", 7, " received");
        logger.stop().await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.contains("logger.rs:"));
        assert!(lines[0].1.ends_with(": Work 7 received"));
    }

    #[tokio::test]
    async fn test_same_level_keeps_call_order() {
        let sink = MemorySink::new();
        let logger = memory_logger(&sink);

        for i in 0..100 {
            log_info!(logger, "record ", i);
        }
        logger.stop().await;

        let rendered: Vec<String> = sink
            .lines()
            .into_iter()
            .map(|(_, line)| line.rsplit(": ").next().unwrap_or_default().to_string())
            .collect();
        let expected: Vec<String> = (0..100).map(|i| format!("record {}", i)).collect();
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn test_stop_drains_accepted_records() {
        let sink = MemorySink::new();
        let logger = memory_logger(&sink);

        for i in 0..50 {
            logger.try_log(Level::Warning, [format!("pending {}", i)]).unwrap();
        }
        logger.stop().await;

        assert_eq!(sink.len(), 50);
        assert!(logger.is_stopped());
    }

    #[tokio::test]
    async fn test_log_after_stop_fails_fast() {
        let sink = MemorySink::new();
        let logger = memory_logger(&sink);
        logger.stop().await;

        let result = tokio::time::timeout(Duration::from_millis(100), async {
            logger.try_log(Level::Info, ["too late"])
        })
        .await
        .expect("log after stop must not block");

        assert_eq!(result, Err(LogError::Stopped));
        assert!(!sink.contains("too late"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_accepted_record_is_rendered_when_stopping_under_load() {
        for _ in 0..50 {
            let sink = MemorySink::new();
            let logger = AsyncLogger::builder()
                .mailbox_capacity(1 << 16)
                .sink(sink.clone())
                .on_fatal(FatalAction::callback(|_| {}))
                .start();

            let producers: Vec<_> = (0..3)
                .map(|n| {
                    let logger = logger.clone();
                    std::thread::spawn(move || {
                        let mut accepted = 0usize;
                        loop {
                            match logger.try_log(Level::Info, [format!("producer {}", n)]) {
                                Ok(()) => accepted += 1,
                                Err(LogError::MailboxFull(_)) => std::thread::yield_now(),
                                Err(LogError::Stopped) => return accepted,
                            }
                        }
                    })
                })
                .collect();

            tokio::time::sleep(Duration::from_millis(2)).await;
            logger.stop().await;

            let accepted: usize = producers.into_iter().map(|p| p.join().unwrap()).sum();
            assert_eq!(sink.len(), accepted);
        }
    }

    #[tokio::test]
    async fn test_stop_twice_is_harmless() {
        let sink = MemorySink::new();
        let logger = memory_logger(&sink);
        let other = logger.clone();

        logger.info("once");
        tokio::join!(logger.stop(), other.stop());
        logger.stop().await;

        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_fatal_renders_then_ends_consumer() {
        let sink = MemorySink::new();
        let (fatal_tx, fatal_rx) = oneshot::channel();
        let fatal_tx = Mutex::new(Some(fatal_tx));
        let logger = AsyncLogger::builder()
            .sink(sink.clone())
            .on_fatal(FatalAction::callback(move |record| {
                if let Some(tx) = fatal_tx.lock().take() {
                    let _ = tx.send(record.message());
                }
            }))
            .start();

        logger.fatal("storage corrupted");
        let message = tokio::time::timeout(Duration::from_secs(5), fatal_rx)
            .await
            .expect("fatal action should run")
            .unwrap();
        assert_eq!(message, "storage corrupted");

        logger.info("after fatal");
        logger.stop().await;

        let alternate = sink.stream_lines(Stream::Alternate);
        assert_eq!(alternate.len(), 1);
        assert!(alternate[0].starts_with("FATAL: "));
        assert!(!sink.contains("after fatal"));
        assert_eq!(logger.try_log(Level::Info, ["later"]), Err(LogError::Stopped));
    }

    struct GateSink {
        memory: MemorySink,
        gate: Arc<Mutex<()>>,
        entered: Mutex<std_mpsc::Sender<()>>,
    }

    impl LogSink for GateSink {
        fn write(&self, stream: Stream, line: &str) {
            let _ = self.entered.lock().send(());
            let _open = self.gate.lock();
            self.memory.write(stream, line);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_mailbox_drops_without_blocking() {
        let memory = MemorySink::new();
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock();
        let (entered_tx, entered_rx) = std_mpsc::channel();

        let logger = AsyncLogger::builder()
            .mailbox_capacity(1)
            .sink(GateSink {
                memory: memory.clone(),
                gate: gate.clone(),
                entered: Mutex::new(entered_tx),
            })
            .start();

        logger.try_log(Level::Info, ["first"]).unwrap();
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("consumer should pick up the first record");

        logger.try_log(Level::Info, ["second"]).unwrap();
        assert_eq!(
            logger.try_log(Level::Info, ["third"]),
            Err(LogError::MailboxFull(Level::Info))
        );
        assert_eq!(logger.dropped(), 1);

        drop(held);
        logger.stop().await;

        assert!(memory.contains("first"));
        assert!(memory.contains("second"));
        assert!(!memory.contains("third"));
    }
}
