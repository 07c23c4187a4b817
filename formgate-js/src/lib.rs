//! Sandboxed JavaScript evaluation for form rules
//!
//! Custom rules are author-supplied JavaScript. They run inside QuickJS
//! (through rquickjs) with nothing but the variables the caller binds.
//!
//! # Architecture
//!
//! - **Dedicated Worker Threads**: each worker owns one rquickjs `Runtime`
//! - **Channel Communication**: async callers send requests over mpsc channels
//!   and await a oneshot reply
//! - **Fresh Context per Script**: every evaluation gets a new `Context`, so
//!   globals written by one rule are never visible to the next
//! - **Explicit Bindings**: no environment, filesystem, module loader or
//!   network objects are installed; only the bound names exist besides the
//!   language builtins
//! - **Bounded Execution**: an interrupt handler aborts scripts that outlive
//!   their time budget, and the runtime carries heap and stack limits
//!
//! # Example
//!
//! ```rust,no_run
//! use formgate_js::{SandboxLimits, ScriptRequest, ScriptSandbox};
//! use serde_json::json;
//!
//! # async fn example() -> formgate_js::Result<()> {
//! let sandbox = ScriptSandbox::new(SandboxLimits::default())?;
//! let request = ScriptRequest::new("valid = input > 10;")
//!     .bind("input", json!(15))
//!     .bind("valid", json!(true))
//!     .read_back("valid");
//! assert_eq!(sandbox.evaluate(request).await?, json!(true));
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;

pub use error::{JsError, Result};

use rquickjs::{CatchResultExt, CaughtError, Context, Runtime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Resource limits applied to every script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Wall-clock budget for one script
    pub timeout: Duration,
    /// Heap limit of each worker runtime
    pub memory_limit_bytes: usize,
    /// Stack limit of each worker runtime
    pub max_stack_bytes: usize,
    /// Number of worker threads
    pub workers: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(250),
            memory_limit_bytes: 10 * 1024 * 1024, // 10 MB
            max_stack_bytes: 512 * 1024,          // 512 KB
            workers: 2,
        }
    }
}

/// A script plus the variables it may see.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    source: String,
    bindings: Vec<(String, serde_json::Value)>,
    read_back: Option<String>,
}

impl ScriptRequest {
    /// Create a request for the given script source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bindings: Vec::new(),
            read_back: None,
        }
    }

    /// Bind a global variable before the script runs
    pub fn bind(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.bindings.push((name.into(), value));
        self
    }

    /// Return this global after the script runs instead of the completion value
    pub fn read_back(mut self, name: impl Into<String>) -> Self {
        self.read_back = Some(name.into());
        self
    }

    /// The script source
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the bound variables, in binding order
    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }
}

/// Request types sent to a worker thread
enum JsRequest {
    Evaluate {
        request: ScriptRequest,
        reply: oneshot::Sender<Result<serde_json::Value>>,
    },
}

/// Handle to one worker thread
struct JsWorker {
    sender: mpsc::Sender<JsRequest>,
}

impl JsWorker {
    /// Spawn a worker thread and return a handle
    fn spawn(index: usize, limits: SandboxLimits) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<JsRequest>();

        std::thread::Builder::new()
            .name(format!("formgate-js-{index}"))
            .spawn(move || {
                Self::worker_loop(rx, limits);
            })
            .map_err(|e| JsError::runtime(format!("failed to spawn script worker: {e}")))?;

        Ok(Self { sender: tx })
    }

    /// The worker loop that owns the rquickjs Runtime
    fn worker_loop(rx: mpsc::Receiver<JsRequest>, limits: SandboxLimits) {
        let deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let mut rt = match build_runtime(&limits, &deadline) {
            Ok(rt) => rt,
            Err(message) => return refuse_requests(&rx, &message),
        };

        let budget_ms = limits.timeout.as_millis() as u64;

        while let Ok(JsRequest::Evaluate { request, reply }) = rx.recv() {
            let started = Instant::now();
            let expires = started + limits.timeout;
            set_deadline(&deadline, Some(expires));

            let result = run_script(&rt, &request);
            let script_elapsed = started.elapsed();
            let drained = drain_pending_jobs(&rt, expires);

            set_deadline(&deadline, None);
            let result = match result {
                Err(_) if script_elapsed >= limits.timeout => {
                    tracing::warn!(budget_ms, "script interrupted after exceeding its budget");
                    Err(JsError::Timeout { budget_ms })
                }
                other => other,
            };
            let _ = reply.send(result);

            if drained {
                rt.run_gc();
                continue;
            }

            // Jobs left behind would keep the script's heap alive for the
            // next request, so the runtime is replaced instead.
            tracing::warn!("script left pending jobs past its budget, recycling runtime");
            drop(rt);
            rt = match build_runtime(&limits, &deadline) {
                Ok(fresh) => fresh,
                Err(message) => return refuse_requests(&rx, &message),
            };
        }

        tracing::debug!("script worker shutting down");
    }
}

/// Answer every remaining request with a runtime error
fn refuse_requests(rx: &mpsc::Receiver<JsRequest>, message: &str) {
    tracing::error!("{message}");
    while let Ok(JsRequest::Evaluate { reply, .. }) = rx.recv() {
        let _ = reply.send(Err(JsError::runtime(message)));
    }
}

/// Create a runtime with the heap, stack and deadline limits installed.
fn build_runtime(
    limits: &SandboxLimits,
    deadline: &Arc<Mutex<Option<Instant>>>,
) -> std::result::Result<Runtime, String> {
    let rt = Runtime::new().map_err(|e| format!("failed to create script runtime: {e}"))?;
    rt.set_memory_limit(limits.memory_limit_bytes);
    rt.set_max_stack_size(limits.max_stack_bytes);

    let handler_deadline = Arc::clone(deadline);
    rt.set_interrupt_handler(Some(Box::new(move || {
        handler_deadline
            .lock()
            .map(|d| d.is_some_and(|d| Instant::now() >= d))
            .unwrap_or(false)
    })));
    Ok(rt)
}

/// Run the promise jobs a script queued, under the same deadline as the
/// script. Returns false when jobs are still pending once it has passed.
fn drain_pending_jobs(rt: &Runtime, expires: Instant) -> bool {
    while rt.is_job_pending() {
        if Instant::now() >= expires {
            return false;
        }
        if let Err(e) = rt.execute_pending_job() {
            tracing::debug!("pending script job failed: {e:?}");
        }
    }
    true
}

fn set_deadline(deadline: &Mutex<Option<Instant>>, value: Option<Instant>) {
    if let Ok(mut guard) = deadline.lock() {
        *guard = value;
    }
}

/// Evaluate one request in a fresh context.
fn run_script(rt: &Runtime, request: &ScriptRequest) -> Result<serde_json::Value> {
    let context = Context::full(rt)
        .map_err(|e| JsError::runtime(format!("failed to create script context: {e}")))?;

    context.with(|ctx| {
        let globals = ctx.globals();
        for (name, value) in &request.bindings {
            let js_value = bridge::json_to_js(&ctx, value)?;
            globals
                .set(name.as_str(), js_value)
                .map_err(|e| JsError::runtime(format!("failed to bind '{}': {}", name, e)))?;
        }

        let completion: rquickjs::Value = ctx
            .eval(request.source.as_bytes())
            .catch(&ctx)
            .map_err(|e| JsError::evaluation(describe_caught(e)))?;

        let result = match &request.read_back {
            Some(name) => globals
                .get::<_, rquickjs::Value>(name.as_str())
                .map_err(|e| JsError::runtime(format!("failed to read '{}': {}", name, e)))?,
            None => completion,
        };

        bridge::js_to_json(&ctx, result)
    })
}

/// Render a caught JS error the way `String(err)` would.
fn describe_caught(caught: CaughtError<'_>) -> String {
    match caught {
        CaughtError::Exception(ex) => {
            let name = ex
                .as_object()
                .get::<_, String>("name")
                .unwrap_or_else(|_| "Error".to_string());
            match ex.message() {
                Some(message) if !message.is_empty() => format!("{}: {}", name, message),
                _ => name,
            }
        }
        CaughtError::Value(v) => {
            let s: std::result::Result<String, _> = v.get();
            s.unwrap_or_else(|_| "uncaught non-error value".to_string())
        }
        CaughtError::Error(e) => e.to_string(),
    }
}

/// Pool of sandbox workers shared by all validations.
///
/// Cloning is not needed; share it behind an `Arc`.
pub struct ScriptSandbox {
    workers: Vec<JsWorker>,
    next: AtomicUsize,
    limits: SandboxLimits,
}

impl ScriptSandbox {
    /// Spawn the worker threads.
    pub fn new(limits: SandboxLimits) -> Result<Self> {
        let count = limits.workers.max(1);
        let workers = (0..count)
            .map(|index| JsWorker::spawn(index, limits.clone()))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(workers = count, budget = ?limits.timeout, "script sandbox started");

        Ok(Self {
            workers,
            next: AtomicUsize::new(0),
            limits,
        })
    }

    /// The limits every script runs under
    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Run a script and return the read-back variable (or completion value) as JSON.
    pub async fn evaluate(&self, request: ScriptRequest) -> Result<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();

        self.workers[index]
            .sender
            .send(JsRequest::Evaluate {
                request,
                reply: tx,
            })
            .map_err(|_| JsError::runtime("script worker has stopped"))?;

        rx.await
            .map_err(|_| JsError::runtime("script worker did not respond"))?
    }
}
