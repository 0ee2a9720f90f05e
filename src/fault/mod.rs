//! Process-level fault isolation.
//!
//! A [`FaultHandler`] turns faults nobody handled into one uniform diagnostic
//! page: an HTML document written once to a sink, plus one `tracing` error
//! line. Three kinds of faults reach it:
//!
//! - warnings escalated with [`escalate`],
//! - panics and returned errors inside [`FaultGuard::run`],
//! - panics the guard only learns about at shutdown (another thread, or a panic
//!   unwinding past `run`), rendered when the guard is dropped.
//!
//! In debug mode the page shows the fault type, location, stack and request
//! context. In production it shows a generic title and a correlation code of
//! the form `ERR_<status>_<8 hex digits>`; the fault message never appears.
//!
//! ```no_run
//! use qrpress::fault::{FaultConfig, FaultHandler};
//!
//! let guard = FaultHandler::new(FaultConfig::default().app_name("my-app")).install();
//! let artifact = guard.run(|| {
//!     let mut builder = qrpress::QrBuilder::new();
//!     builder.payload("hello");
//!     builder.build()
//! });
//! ```

mod page;

use rand::Rng;
use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe, Location, PanicHookInfo};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

/// Most stack frames kept per fault.
const MAX_FRAMES: usize = 32;

type Sink = Box<dyn Write + Send>;
type Hook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Request that was being served when the fault happened. Shown in debug mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    pub uri: String,
    pub remote_addr: String,
    pub protocol: String,
}

/// Settings of a [`FaultHandler`].
pub struct FaultConfig {
    debug: bool,
    status: u16,
    exit_on_fault: bool,
    app_name: String,
    request: Option<RequestContext>,
    sink: Sink,
}

impl FaultConfig {
    pub const DEFAULT_STATUS: u16 = 500;

    /// Shows fault details on the page instead of a correlation code.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// HTTP-style status reported on the page.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Terminates the process with exit code 1 after a fault is rendered.
    /// On by default.
    pub fn exit_on_fault(mut self, exit: bool) -> Self {
        self.exit_on_fault = exit;
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    /// Where the page is written. Defaults to standard error.
    pub fn sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            debug: false,
            status: Self::DEFAULT_STATUS,
            exit_on_fault: true,
            app_name: env!("CARGO_PKG_NAME").to_string(),
            request: None,
            sink: Box::new(io::stderr()),
        }
    }
}

impl fmt::Debug for FaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultConfig")
            .field("debug", &self.debug)
            .field("status", &self.status)
            .field("exit_on_fault", &self.exit_on_fault)
            .field("app_name", &self.app_name)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// What raised a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A warning raised with [`escalate`].
    Warning,
    /// An error returned from [`FaultGuard::run`].
    Error,
    /// A panic caught by [`FaultGuard::run`].
    Panic,
    /// A panic rendered when the guard was dropped.
    Shutdown,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultKind::Warning => "Warning",
            FaultKind::Error => "Error",
            FaultKind::Panic => "Panic",
            FaultKind::Shutdown => "Shutdown",
        })
    }
}

/// One line of a fault's stack: a backtrace frame or a link of a cause chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    label: String,
    location: Option<String>,
}

impl Frame {
    pub fn new(label: impl Into<String>, location: Option<String>) -> Self {
        Self {
            label: label.into(),
            location,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

/// A fault as shown on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    type_name: String,
    message: String,
    file: String,
    line: u32,
    thread: String,
    frames: Vec<Frame>,
}

impl Fault {
    pub fn new(
        kind: FaultKind,
        type_name: impl Into<String>,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            message: message.into(),
            file: file.into(),
            line,
            thread: current_thread_name(),
            frames: Vec::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    /// A returned error; the stack is its cause chain.
    fn from_error(type_name: &str, err: &(dyn Error + 'static), location: &Location<'_>) -> Self {
        let mut frames = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            frames.push(Frame::new(cause.to_string(), None));
            source = cause.source();
        }
        Fault::new(
            FaultKind::Error,
            type_name,
            err.to_string(),
            location.file(),
            location.line(),
        )
        .with_frames(frames)
    }

    /// A panic seen by the hook.
    fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let frames = parse_backtrace(&Backtrace::force_capture().to_string());
        let (file, line) = info
            .location()
            .map_or(("<unknown>", 0), |loc| (loc.file(), loc.line()));

        if let Some(escalated) = info.payload().downcast_ref::<Fault>() {
            return escalated.clone().with_frames(frames);
        }
        Fault::new(
            FaultKind::Panic,
            "panic",
            payload_message(info.payload()),
            file,
            line,
        )
        .with_frames(frames)
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Name (or id) of the thread the fault happened on.
    pub fn thread(&self) -> &str {
        &self.thread
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// Outcome of a rendered fault, returned by [`FaultGuard::run`] when the
/// handler does not terminate the process.
#[derive(Debug, thiserror::Error)]
#[error("[{status}] {code}: {} fault in {}:{}", .fault.kind, .fault.file, .fault.line)]
pub struct FaultReport {
    status: u16,
    code: String,
    fault: Fault,
}

impl FaultReport {
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The correlation code shown to users, `ERR_<status>_<8 hex digits>`.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }
}

/// Raises a recoverable warning as a fault.
///
/// Inside [`FaultGuard::run`] the warning is rendered like any other fault;
/// the caller's location is reported.
#[track_caller]
pub fn escalate(message: impl Into<String>) -> ! {
    let location = Location::caller();
    panic::panic_any(Fault::new(
        FaultKind::Warning,
        "warning",
        message,
        location.file(),
        location.line(),
    ))
}

/// Fault handler waiting to be installed.
#[derive(Debug)]
pub struct FaultHandler {
    config: FaultConfig,
}

impl FaultHandler {
    pub fn new(config: FaultConfig) -> Self {
        Self { config }
    }

    /// Installs the handler as the process panic hook.
    ///
    /// The last installed handler wins. Dropping the returned guard renders any
    /// fault still pending and puts the previous hook back.
    pub fn install(self) -> FaultGuard {
        let FaultConfig {
            debug,
            status,
            exit_on_fault,
            app_name,
            request,
            sink,
        } = self.config;
        let shared = Arc::new(Shared {
            debug,
            status,
            exit_on_fault,
            app_name,
            request,
            sink: Mutex::new(Some(sink)),
            pending: Mutex::new(Pending::default()),
        });

        let previous = panic::take_hook();
        let hook_state = Arc::clone(&shared);
        panic::set_hook(Box::new(move |info| {
            lock(&hook_state.pending).record(|| Fault::from_panic(info));
        }));
        tracing::debug!(debug = shared.debug, status = shared.status, "fault handler installed");

        FaultGuard {
            shared,
            previous: Some(previous),
        }
    }
}

struct Shared {
    debug: bool,
    status: u16,
    exit_on_fault: bool,
    app_name: String,
    request: Option<RequestContext>,
    /// `None` once a page has been written.
    sink: Mutex<Option<Sink>>,
    /// Panics seen by the hook and not rendered yet.
    pending: Mutex<Pending>,
}

/// Most panics kept for rendering; later ones are only counted.
const MAX_PENDING: usize = 16;

#[derive(Debug, Default)]
struct Pending {
    faults: Vec<Fault>,
    dropped: usize,
}

impl Pending {
    /// Keeps the fault built by `capture`, or only counts it once full.
    fn record(&mut self, capture: impl FnOnce() -> Fault) {
        if self.faults.len() >= MAX_PENDING {
            self.dropped += 1;
        } else {
            self.faults.push(capture());
        }
    }

    fn len(&self) -> usize {
        self.faults.len() + self.dropped
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn take_pending_for_current_thread(&self) -> Option<Fault> {
        let thread = current_thread_name();
        let mut pending = lock(&self.pending);
        let index = pending.faults.iter().rposition(|fault| fault.thread == thread)?;
        Some(pending.faults.remove(index))
    }

    /// Logs and renders `fault`, then exits or returns the report.
    fn handle(&self, fault: Fault) -> FaultReport {
        let code = correlation_code(self.status);
        let timestamp = chrono::Utc::now().to_rfc3339();

        tracing::error!(
            status = self.status,
            code = %code,
            kind = %fault.kind(),
            timestamp = %timestamp,
            "[{}] {} in {}:{}",
            self.status,
            fault.message(),
            fault.file(),
            fault.line()
        );

        let html = page::Page {
            status: self.status,
            code: &code,
            debug: self.debug,
            app_name: &self.app_name,
            request: self.request.as_ref(),
            timestamp: &timestamp,
        }
        .render(&fault);
        self.write_sealed(&html);

        if self.exit_on_fault {
            std::process::exit(1);
        }
        FaultReport {
            status: self.status,
            code,
            fault,
        }
    }

    /// Writes the page and seals the sink; later pages are dropped.
    fn write_sealed(&self, html: &str) {
        let Some(mut sink) = lock(&self.sink).take() else {
            tracing::warn!("fault page already written; skipping");
            return;
        };
        if let Err(err) = sink.write_all(html.as_bytes()).and_then(|()| sink.flush()) {
            tracing::warn!(error = %err, "failed to write fault page");
        }
    }
}

/// Installed fault handler. Dropping it uninstalls the handler.
pub struct FaultGuard {
    shared: Arc<Shared>,
    previous: Option<Hook>,
}

impl FaultGuard {
    /// Runs the host body, rendering a returned error or a panic as a fault.
    ///
    /// # Errors
    ///
    /// A [`FaultReport`] when `body` failed and the handler is configured not to
    /// exit the process.
    #[track_caller]
    pub fn run<T, E>(&self, body: impl FnOnce() -> Result<T, E>) -> Result<T, FaultReport>
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let location = Location::caller();
        let fault = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                let err: Box<dyn Error + Send + Sync> = err.into();
                Fault::from_error(std::any::type_name::<E>(), &*err, location)
            }
            Err(payload) => self
                .shared
                .take_pending_for_current_thread()
                .unwrap_or_else(|| {
                    Fault::new(
                        FaultKind::Panic,
                        "panic",
                        payload_message(&*payload),
                        location.file(),
                        location.line(),
                    )
                }),
        };
        Err(self.shared.handle(fault))
    }

    /// Number of captured panics that have not been rendered yet.
    ///
    /// Only the first few keep their details; the rest are counted.
    pub fn pending(&self) -> usize {
        lock(&self.shared.pending).len()
    }
}

impl Drop for FaultGuard {
    fn drop(&mut self) {
        let pending = std::mem::take(&mut *lock(&self.shared.pending));
        if pending.dropped > 0 {
            tracing::warn!(dropped = pending.dropped, "panics beyond the pending limit were not kept");
        }
        if let Some(first) = pending.faults.into_iter().next() {
            let fault = match first.kind {
                FaultKind::Panic => Fault {
                    kind: FaultKind::Shutdown,
                    ..first
                },
                _ => first,
            };
            self.shared.handle(fault);
        }

        // the hook cannot be swapped while this thread is unwinding
        if thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            panic::set_hook(previous);
        }
    }
}

impl fmt::Debug for FaultGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultGuard")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// `ERR_<status>_<8 hex digits>` from the thread-local CSPRNG.
fn correlation_code(status: u16) -> String {
    format!("ERR_{status}_{:08x}", rand::rng().random::<u32>())
}

fn current_thread_name() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(fault) = payload.downcast_ref::<Fault>() {
        fault.message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Extracts application frames from a rendered [`Backtrace`].
///
/// Runtime frames (`std`, `core`, the unwinder and this module) are skipped.
fn parse_backtrace(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut keep_last = false;
    for line in rendered.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if keep_last {
                if let Some(frame) = frames.last_mut() {
                    frame.location = Some(location.to_string());
                }
            }
            continue;
        }
        let Some((index, function)) = line.split_once(": ") else {
            continue;
        };
        if !index.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        keep_last = !is_runtime_frame(function);
        if keep_last && frames.len() < MAX_FRAMES {
            frames.push(Frame::new(function, None));
        } else {
            keep_last = false;
        }
    }
    frames
}

fn is_runtime_frame(function: &str) -> bool {
    const RUNTIME: [&str; 7] = [
        "std::",
        "core::",
        "alloc::",
        "rust_begin_unwind",
        "__rust",
        "<alloc::boxed::Box",
        "qrpress::fault::",
    ];
    RUNTIME.iter().any(|prefix| function.starts_with(prefix))
}
