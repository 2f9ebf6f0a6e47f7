//! Automation session: one open document inside one private host instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use macrodrive_protocol::ScalarValue;

use crate::error::{SessionError, TeardownError};
use crate::host::{AutomationHost, HostConfig, ProcessHost};
use crate::registry::DisposalRegistry;

/// Session lifecycle. `Open` is the only state in which invocation and save
/// are valid; there is no uninitialized state, because construction either
/// yields an open session or no session at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Closed,
}

/// One open document inside one exclusively-owned automation host instance.
///
/// Every handle the session acquires is registered with its disposal
/// registry in the same step it is acquired, so teardown — explicit
/// [`close`](Self::close) or the `Drop` safety net — releases the chain
/// newest-first no matter where the session stopped.
///
/// Calls into the host block for as long as the host takes; a data-heavy
/// macro can run for tens of minutes and cannot be interrupted. Run each
/// session on a worker dedicated to blocking work, and never share a
/// session (or a host process) between callers.
///
/// # Example
///
/// ```rust,no_run
/// use macrodrive::{AutomationSession, HostConfig};
///
/// # fn example() -> Result<(), macrodrive::SessionError> {
/// let mut session = AutomationSession::launch(HostConfig::default(), "/data/template.xlsm")?;
/// session.invoke("ThisWorkbook.TestMacro4", &["a1".into(), "a2".into()])?;
/// session.save_as("/data/result.xlsm")?;
/// session.close()?;
/// # Ok(())
/// # }
/// ```
pub struct AutomationSession<H: AutomationHost> {
    host: Arc<H>,
    document_path: PathBuf,
    /// File name of the document, used to qualify macro names.
    document_name: String,
    registry: DisposalRegistry,
    /// Handle of the open document; save targets it. The container and
    /// sheet-collection handles live on inside their registered release
    /// actions.
    document: u64,
    state: SessionState,
}

impl<H: AutomationHost> std::fmt::Debug for AutomationSession<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationSession")
            .field("document_path", &self.document_path)
            .field("document_name", &self.document_name)
            .field("document", &self.document)
            .field("state", &self.state)
            .finish()
    }
}

impl AutomationSession<ProcessHost> {
    /// Start a private host process and open `path` in it.
    pub fn launch(config: HostConfig, path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let host = Arc::new(ProcessHost::start(config)?);
        Self::open_with(host, path)
    }
}

impl<H: AutomationHost + 'static> AutomationSession<H> {
    /// Open `path` in a host instance the caller has already acquired.
    ///
    /// Each acquisition step registers its release action before the next
    /// step runs. If a step fails, the constructor applies the scoped
    /// teardown itself — disposes the registry, then force-terminates the
    /// host — and returns the step's error; nothing acquired is leaked.
    pub fn open_with(host: Arc<H>, path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let document_path = path.into();
        let document_name = document_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut registry = DisposalRegistry::new();
        match Self::acquire(&host, &document_path, &mut registry) {
            Ok(document) => {
                tracing::info!(document = %document_name, "session open");
                Ok(Self {
                    host,
                    document_path,
                    document_name,
                    registry,
                    document,
                    state: SessionState::Open,
                })
            }
            Err(err) => {
                // Scoped teardown on the caller's behalf: no session value
                // exists for them to close.
                if let Err(teardown) = registry.dispose_all() {
                    tracing::warn!(%teardown, "teardown after failed open reported failures");
                }
                if let Err(term) = host.terminate() {
                    tracing::warn!(%term, "host terminate backstop failed");
                }
                Err(err)
            }
        }
    }

    fn acquire(
        host: &Arc<H>,
        path: &Path,
        registry: &mut DisposalRegistry,
    ) -> Result<u64, SessionError> {
        let quit = Arc::clone(host);
        registry.register("host", move || quit.quit())?;

        host.configure_silent()?;

        let documents = host.open_documents()?;
        let release = Arc::clone(host);
        registry.register("documents", move || release.release(documents))?;

        let document = host
            .open_document(documents, &path.to_string_lossy())
            .map_err(|source| SessionError::DocumentOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let release = Arc::clone(host);
        registry.register("document", move || release.release(document))?;

        let sheets = host.sheets(document)?;
        let release = Arc::clone(host);
        registry.register("sheets", move || release.release(sheets))?;

        Ok(document)
    }
}

impl<H: AutomationHost> AutomationSession<H> {
    /// Invoke a macro inside the open document.
    ///
    /// The name is qualified with the document's file name
    /// (`report.xlsm!ThisWorkbook.Refresh`) and dispatched to the host call
    /// shape matching the literal argument count; the arguments are
    /// forwarded unmodified. Ten or more arguments are rejected before any
    /// host call is made. Blocks until the macro returns.
    pub fn invoke(
        &self,
        macro_name: &str,
        args: &[ScalarValue],
    ) -> Result<ScalarValue, SessionError> {
        self.ensure_open()?;

        let name = format!("{}!{}", self.document_name, macro_name);
        tracing::debug!(%name, arity = args.len(), "invoking macro");

        let host = self.host.as_ref();
        let outcome = match args {
            [] => host.run_macro0(&name),
            [a1] => host.run_macro1(&name, a1),
            [a1, a2] => host.run_macro2(&name, a1, a2),
            [a1, a2, a3] => host.run_macro3(&name, a1, a2, a3),
            [a1, a2, a3, a4] => host.run_macro4(&name, a1, a2, a3, a4),
            [a1, a2, a3, a4, a5] => host.run_macro5(&name, a1, a2, a3, a4, a5),
            [a1, a2, a3, a4, a5, a6] => host.run_macro6(&name, a1, a2, a3, a4, a5, a6),
            [a1, a2, a3, a4, a5, a6, a7] => host.run_macro7(&name, a1, a2, a3, a4, a5, a6, a7),
            [a1, a2, a3, a4, a5, a6, a7, a8] => {
                host.run_macro8(&name, a1, a2, a3, a4, a5, a6, a7, a8)
            }
            [a1, a2, a3, a4, a5, a6, a7, a8, a9] => {
                host.run_macro9(&name, a1, a2, a3, a4, a5, a6, a7, a8, a9)
            }
            _ => return Err(SessionError::UnsupportedArity(args.len())),
        };

        outcome.map_err(|source| SessionError::MacroInvocation { name, source })
    }

    /// Persist the open document at `target`. Session state is unchanged.
    pub fn save_as(&self, target: impl AsRef<Path>) -> Result<(), SessionError> {
        self.ensure_open()?;

        let target = target.as_ref();
        self.host
            .save_document_as(self.document, &target.to_string_lossy())
            .map_err(|source| SessionError::Save {
                path: target.to_path_buf(),
                source,
            })?;
        tracing::info!(target = %target.display(), "document saved");
        Ok(())
    }

    /// Tear the session down: release every registered handle newest-first,
    /// then force-terminate the host process as an independent backstop.
    ///
    /// Idempotent. Release failures are collected across the whole chain and
    /// reported together; the terminate backstop runs regardless and its own
    /// failure is only logged. After `close`, [`invoke`](Self::invoke) and
    /// [`save_as`](Self::save_as) fail with [`SessionError::SessionClosed`].
    pub fn close(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.teardown().map_err(SessionError::from)
    }

    /// The document's file name, as used to qualify macro names.
    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// The path the session opened.
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(SessionError::SessionClosed),
        }
    }

    fn teardown(&mut self) -> Result<(), TeardownError> {
        let disposal = self.registry.dispose_all();
        if let Err(err) = self.host.terminate() {
            tracing::warn!(%err, "host terminate backstop failed");
        }
        tracing::info!(document = %self.document_name, "session closed");
        disposal
    }
}

impl<H: AutomationHost> Drop for AutomationSession<H> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Closed;
            if let Err(err) = self.teardown() {
                tracing::warn!(%err, "teardown during drop reported failures");
            }
        }
    }
}
