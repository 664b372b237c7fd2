//! Stdio bridge implementation

use crate::types::{BridgeStatus, StreamType};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Read buffer size for every pump
const BUFFER_SIZE: usize = 8192;

/// Chunks queued towards a single child's stdin before the stdin pump waits
const CHILD_INPUT_QUEUE: usize = 64;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

type SharedWriter = Arc<Mutex<BoxedWriter>>;

/// The supervisor-side ends of the bridge.
pub struct StdioEndpoints {
    pub stdin: BoxedReader,
    pub stdout: BoxedWriter,
    pub stderr: BoxedWriter,
}

impl StdioEndpoints {
    /// The supervisor process's own standard streams.
    pub fn inherit() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), tokio::io::stderr())
    }

    pub fn new(
        stdin: impl AsyncRead + Send + Unpin + 'static,
        stdout: impl AsyncWrite + Send + Unpin + 'static,
        stderr: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        }
    }
}

impl std::fmt::Debug for StdioEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioEndpoints").finish_non_exhaustive()
    }
}

/// Input binding for one child: its generation and the queue its writer drains.
#[derive(Clone)]
struct ChildInput {
    generation: u64,
    tx: mpsc::Sender<Vec<u8>>,
}

#[derive(Default)]
struct Counters {
    stdin_bytes: AtomicU64,
    stdout_bytes: AtomicU64,
    stderr_bytes: AtomicU64,
    last_activity: RwLock<Option<chrono::DateTime<Utc>>>,
}

impl Counters {
    fn record(&self, stream: StreamType, bytes: usize) {
        let counter = match stream {
            StreamType::Stdin => &self.stdin_bytes,
            StreamType::Stdout => &self.stdout_bytes,
            StreamType::Stderr => &self.stderr_bytes,
        };
        counter.fetch_add(bytes as u64, Ordering::Relaxed);
        *self.last_activity.write() = Some(Utc::now());
    }
}

/// Connects the supervisor's stdio to the current child's stdio.
///
/// At most one child is attached for input at a time. [`attach`](Self::attach)
/// replaces the binding, [`detach`](Self::detach) clears it if it still belongs
/// to the given generation. Output pumps are per child and end on EOF.
pub struct StdioBridge {
    current: Arc<watch::Sender<Option<ChildInput>>>,
    stdout: SharedWriter,
    stderr: SharedWriter,
    counters: Arc<Counters>,
    input_closed: CancellationToken,
    stdin_task: JoinHandle<()>,
    output_tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for StdioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioBridge")
            .field("attached_generation", &self.attached_generation())
            .field("input_closed", &self.input_closed.is_cancelled())
            .finish()
    }
}

impl StdioBridge {
    /// Create the bridge and start pumping `endpoints.stdin`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(endpoints: StdioEndpoints) -> Self {
        let (current, _) = watch::channel(None);
        let current = Arc::new(current);
        let counters = Arc::new(Counters::default());
        let input_closed = CancellationToken::new();

        let stdin_task = tokio::spawn(pump_stdin(
            endpoints.stdin,
            Arc::clone(&current),
            Arc::clone(&counters),
            input_closed.clone(),
        ));

        Self {
            current,
            stdout: Arc::new(Mutex::new(endpoints.stdout)),
            stderr: Arc::new(Mutex::new(endpoints.stderr)),
            counters,
            input_closed,
            stdin_task,
            output_tasks: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Take the child's piped streams and attach them under `generation`.
    pub fn attach_child(&self, generation: u64, child: &mut Child) {
        self.attach(
            generation,
            child.stdin.take(),
            child.stdout.take(),
            child.stderr.take(),
        );
    }

    /// Attach a child's streams. The child becomes the stdin target and its
    /// output is forwarded until EOF.
    pub fn attach<W, O, E>(
        &self,
        generation: u64,
        stdin: Option<W>,
        stdout: Option<O>,
        stderr: Option<E>,
    ) where
        W: AsyncWrite + Send + Unpin + 'static,
        O: AsyncRead + Send + Unpin + 'static,
        E: AsyncRead + Send + Unpin + 'static,
    {
        {
            let mut tasks = self.output_tasks.lock();
            tasks.retain(|task| !task.is_finished());

            if let Some(source) = stdout {
                tasks.push(tokio::spawn(pump_output(
                    generation,
                    StreamType::Stdout,
                    source,
                    Arc::clone(&self.stdout),
                    Arc::clone(&self.counters),
                )));
            }

            if let Some(source) = stderr {
                tasks.push(tokio::spawn(pump_output(
                    generation,
                    StreamType::Stderr,
                    source,
                    Arc::clone(&self.stderr),
                    Arc::clone(&self.counters),
                )));
            }
        }

        match stdin {
            Some(sink) if !self.input_closed.is_cancelled() => {
                let (tx, rx) = mpsc::channel(CHILD_INPUT_QUEUE);
                tokio::spawn(pump_child_input(generation, sink, rx));
                self.current.send_replace(Some(ChildInput { generation, tx }));

                // EOF may have raced with the binding above
                if self.input_closed.is_cancelled() {
                    self.current.send_replace(None);
                }
            }
            Some(sink) => {
                debug!(generation, "Supervisor stdin already closed, closing child stdin");
                drop(sink);
                self.current.send_replace(None);
            }
            None => {
                self.current.send_replace(None);
            }
        }

        debug!(generation, "Child streams attached");
    }

    /// Stop routing stdin to `generation`. A newer binding is left untouched.
    pub fn detach(&self, generation: u64) {
        let detached = self.current.send_if_modified(|current| {
            if current.as_ref().map(|input| input.generation) == Some(generation) {
                *current = None;
                true
            } else {
                false
            }
        });

        if detached {
            debug!(generation, "Child stdin detached");
        }
    }

    /// Generation currently receiving stdin.
    pub fn attached_generation(&self) -> Option<u64> {
        self.current.borrow().as_ref().map(|input| input.generation)
    }

    /// Token cancelled once the supervisor's stdin reaches EOF.
    pub fn input_closed(&self) -> CancellationToken {
        self.input_closed.clone()
    }

    /// Wait up to `limit` for every child output stream to reach EOF.
    ///
    /// Returns false if some stream was still open when the limit expired,
    /// e.g. because a grandchild inherited the pipe.
    pub async fn drain_output(&self, limit: Duration) -> bool {
        let tasks = std::mem::take(&mut *self.output_tasks.lock());
        let drained = tokio::time::timeout(limit, async move {
            for task in tasks {
                let _ = task.await;
            }
        })
        .await
        .is_ok();

        if !drained {
            debug!(limit_ms = limit.as_millis() as u64, "Child output still open after drain limit");
        }
        drained
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            attached_generation: self.attached_generation(),
            input_closed: self.input_closed.is_cancelled(),
            stdin_bytes: self.counters.stdin_bytes.load(Ordering::Relaxed),
            stdout_bytes: self.counters.stdout_bytes.load(Ordering::Relaxed),
            stderr_bytes: self.counters.stderr_bytes.load(Ordering::Relaxed),
            last_activity: *self.counters.last_activity.read(),
        }
    }
}

impl Drop for StdioBridge {
    fn drop(&mut self) {
        self.stdin_task.abort();
    }
}

async fn pump_stdin(
    mut source: BoxedReader,
    current: Arc<watch::Sender<Option<ChildInput>>>,
    counters: Arc<Counters>,
    input_closed: CancellationToken,
) {
    let mut rx = current.subscribe();
    let mut buf = vec![0u8; BUFFER_SIZE];

    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to read supervisor stdin");
                break;
            }
        };

        counters.record(StreamType::Stdin, n);
        if !deliver(&mut rx, buf[..n].to_vec()).await {
            break;
        }
    }

    debug!("Supervisor stdin closed");
    input_closed.cancel();
    // Dropping the binding drops the last sender, so the child's writer closes its stdin
    current.send_replace(None);
}

/// Hand `chunk` to the attached child, waiting for one if necessary.
/// Returns false once the bridge is gone.
async fn deliver(rx: &mut watch::Receiver<Option<ChildInput>>, mut chunk: Vec<u8>) -> bool {
    loop {
        let input = match rx.wait_for(Option::is_some).await {
            Ok(current) => current.clone(),
            Err(_) => return false,
        };
        let Some(input) = input else { continue };

        match input.tx.send(chunk).await {
            Ok(()) => return true,
            Err(mpsc::error::SendError(returned)) => {
                chunk = returned;
                debug!(
                    generation = input.generation,
                    "Child stdin gone, holding input for the next child"
                );
                let changed = rx
                    .wait_for(|current| {
                        current.as_ref().map(|c| c.generation) != Some(input.generation)
                    })
                    .await;
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}

async fn pump_child_input<W>(generation: u64, mut sink: W, mut rx: mpsc::Receiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = write_chunk(&mut sink, &chunk).await {
            debug!(generation, error = %e, "Child stdin write failed");
            return;
        }
    }

    let _ = sink.shutdown().await;
    debug!(generation, "Child stdin closed");
}

async fn pump_output<R>(
    generation: u64,
    stream: StreamType,
    mut source: R,
    sink: SharedWriter,
    counters: Arc<Counters>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut sink_failed = false;

    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(generation, %stream, error = %e, "Error reading child output");
                break;
            }
        };

        // Keep draining after a sink failure so the child never blocks on a full pipe
        if sink_failed {
            continue;
        }

        let mut out = sink.lock().await;
        if let Err(e) = write_chunk(&mut *out, &buf[..n]).await {
            warn!(generation, %stream, error = %e, "Failed to forward child output");
            sink_failed = true;
            continue;
        }
        drop(out);
        counters.record(stream, n);
    }

    debug!(generation, %stream, "Child output stream ended");
}

async fn write_chunk<W>(sink: &mut W, chunk: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    sink.write_all(chunk).await?;
    sink.flush().await
}
