//! Process lifecycle under a container orchestrator.
//!
//! [`Lifecycle::init`] registers the SIGINT and SIGTERM handlers and takes
//! ownership of the log flush handle, first thing at startup. When
//! [`Lifecycle::wait_for_signal`] resolves, the server drains and
//! [`Lifecycle::teardown`] flushes buffered log output exactly once and
//! yields the exit status.

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::{Mutex, PoisonError};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// Signals that end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT, e.g. Ctrl-C in a terminal
    Interrupt,
    /// SIGTERM, sent by the orchestrator before stopping the container
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("Interrupt"),
            ShutdownSignal::Terminate => f.write_str("Terminated"),
        }
    }
}

/// Handle that pushes buffered log output to its destination.
pub trait Flush: Send {
    fn flush(self: Box<Self>);
}

/// Dropping the guard drains the non-blocking writer's queue.
impl Flush for WorkerGuard {
    fn flush(self: Box<Self>) {
        drop(self);
    }
}

/// Registered signal listeners. A signal that arrives after
/// [`Signals::install`] is kept until [`Signals::recv`] is polled.
pub struct Signals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl Signals {
    /// Register the handlers. Must be called inside the tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Resolve on the first SIGINT or SIGTERM.
    #[cfg(unix)]
    pub async fn recv(mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        }
    }

    #[cfg(windows)]
    pub async fn recv(mut self) -> ShutdownSignal {
        self.ctrl_c.recv().await;
        ShutdownSignal::Interrupt
    }
}

pub struct Lifecycle {
    flusher: Mutex<Option<Box<dyn Flush>>>,
    signals: Mutex<Option<Signals>>,
}

impl Lifecycle {
    /// Register the signal handlers and take the flush handle.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be registered.
    pub fn init(flusher: impl Flush + 'static) -> io::Result<Self> {
        let signals = Signals::install()?;

        Ok(Self {
            flusher: Mutex::new(Some(Box::new(flusher))),
            signals: Mutex::new(Some(signals)),
        })
    }

    /// Future resolving on the first SIGINT or SIGTERM since [`init`](Self::init).
    ///
    /// Only the first call listens; later calls never resolve.
    pub fn wait_for_signal(&self) -> impl Future<Output = ShutdownSignal> + Send + use<> {
        let signals = self
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        async move {
            match signals {
                Some(signals) => signals.recv().await,
                None => std::future::pending().await,
            }
        }
    }

    /// Log the signal, flush logs and return the exit status.
    ///
    /// Only the first call flushes; later calls just return the status.
    pub fn teardown(&self, signal: ShutdownSignal) -> i32 {
        info!("Caught Signal {signal}");

        let flusher = self
            .flusher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(flusher) = flusher {
            flusher.flush();
        }

        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFlusher(Arc<AtomicUsize>);

    impl Flush for CountingFlusher {
        fn flush(self: Box<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn teardown_flushes_once_and_exits_cleanly() {
        let flushes = Arc::new(AtomicUsize::new(0));
        let lifecycle = Lifecycle::init(CountingFlusher(flushes.clone())).unwrap();

        assert_eq!(lifecycle.teardown(ShutdownSignal::Terminate), 0);
        assert_eq!(lifecycle.teardown(ShutdownSignal::Interrupt), 0);
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn teardown_drains_the_non_blocking_writer() {
        let buf = SharedBuf::default();
        let (writer, guard) = tracing_appender::non_blocking(buf.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let lifecycle = Lifecycle::init(guard).unwrap();
            lifecycle.teardown(ShutdownSignal::Terminate);
        });

        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Caught Signal Terminated"), "{output}");
    }

    #[test]
    fn signal_names_match_strsignal() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "Interrupt");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "Terminated");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_before_serving_is_not_lost() {
        let flushes = Arc::new(AtomicUsize::new(0));
        let lifecycle = Lifecycle::init(CountingFlusher(flushes.clone())).unwrap();

        // Delivered before anything polls the listener.
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let signal = lifecycle.wait_for_signal().await;
        assert_eq!(signal, ShutdownSignal::Terminate);
        assert_eq!(lifecycle.teardown(signal), 0);
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }
}
