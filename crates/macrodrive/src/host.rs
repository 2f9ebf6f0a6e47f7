//! The automation host boundary: trait surface and subprocess transport.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use macrodrive_protocol::{
    Command, Request, Response, ResponseData, ResponseResult, ScalarValue,
};

use crate::error::HostError;

/// Operations a session needs from the automation host.
///
/// Handles are opaque IDs minted by the host process; releasing one drops
/// the host-side reference it names. Macro invocation has no variadic form:
/// the host offers one call shape per argument count, zero through nine, and
/// callers pick the shape matching their literal argument list.
///
/// All methods take `&self`; implementations serialize access internally.
pub trait AutomationHost: Send + Sync {
    /// Put the host into unattended mode: no prompts, nothing rendered.
    fn configure_silent(&self) -> Result<(), HostError>;

    /// Acquire the document-container handle.
    fn open_documents(&self) -> Result<u64, HostError>;

    /// Open the document at `path` through the container.
    fn open_document(&self, documents: u64, path: &str) -> Result<u64, HostError>;

    /// Acquire the sheet-collection handle of an open document.
    fn sheets(&self, document: u64) -> Result<u64, HostError>;

    fn run_macro0(&self, name: &str) -> Result<ScalarValue, HostError>;
    fn run_macro1(&self, name: &str, a1: &ScalarValue) -> Result<ScalarValue, HostError>;
    fn run_macro2(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    fn run_macro3(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    fn run_macro4(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    fn run_macro5(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    #[allow(clippy::too_many_arguments)]
    fn run_macro6(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    #[allow(clippy::too_many_arguments)]
    fn run_macro7(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
        a7: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    #[allow(clippy::too_many_arguments)]
    fn run_macro8(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
        a7: &ScalarValue,
        a8: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;
    #[allow(clippy::too_many_arguments)]
    fn run_macro9(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
        a7: &ScalarValue,
        a8: &ScalarValue,
        a9: &ScalarValue,
    ) -> Result<ScalarValue, HostError>;

    /// Persist an open document at `path`.
    fn save_document_as(&self, document: u64, path: &str) -> Result<(), HostError>;

    /// Drop one host-side reference.
    fn release(&self, handle: u64) -> Result<(), HostError>;

    /// Graceful host shutdown. This is the host-instance release action.
    fn quit(&self) -> Result<(), HostError>;

    /// Hard stop of the host process, independent of the release chain.
    fn terminate(&self) -> Result<(), HostError>;
}

/// File name of the host launcher searched for next to the current executable.
const HOST_EXE_NAME: &str = "macrodrive-host";

/// Configuration for launching the automation host process.
#[derive(Default)]
pub struct HostConfig {
    /// Path to the host launcher executable. If None, searches next to the
    /// current executable for `macrodrive-host`.
    pub host_exe_path: Option<PathBuf>,

    /// Extra arguments passed to the launcher.
    pub extra_args: Vec<String>,
}

/// The automation host reached through a spawned launcher process.
///
/// Speaks newline-delimited JSON over the child's stdio: one request per
/// line out, one response per line back, correlated by request ID. Calls
/// block until the host answers — a macro invocation returns when the macro
/// does, however long that takes.
pub struct ProcessHost {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    next_id: AtomicU64,
}

impl ProcessHost {
    /// Spawn the host launcher and initialize the host application.
    pub fn start(config: HostConfig) -> Result<Self, HostError> {
        let exe_path = match config.host_exe_path {
            Some(path) => path,
            None => find_host_exe().ok_or(HostError::NotFound)?,
        };

        let mut cmd = std::process::Command::new(&exe_path);
        for arg in &config.extra_args {
            cmd.arg(arg);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // host diagnostics go to our stderr

        tracing::info!("starting automation host: {}", exe_path.display());
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HostError::NotFound
            } else {
                HostError::SpawnFailed(e)
            }
        })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let host = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicU64::new(1),
        };

        host.send_command(Command::Init)?;

        Ok(host)
    }

    /// Send a command to the host and wait for the matching response.
    fn send_command(&self, command: Command) -> Result<Option<ResponseData>, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let request = Request { id, command };
        let json = serde_json::to_string(&request)?;

        {
            let mut stdin = self.stdin.lock().unwrap();
            writeln!(stdin, "{json}").map_err(|e| HostError::SendFailed(e.to_string()))?;
            stdin
                .flush()
                .map_err(|e| HostError::SendFailed(e.to_string()))?;
        }

        let response: Response = {
            let mut stdout = self.stdout.lock().unwrap();
            let mut line = String::new();
            stdout
                .read_line(&mut line)
                .map_err(|e| HostError::ReadFailed(e.to_string()))?;

            if line.is_empty() {
                return Err(HostError::NotRunning);
            }

            serde_json::from_str(&line)?
        };

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { message } => Err(HostError::Rejected(message)),
        }
    }

    fn expect_handle(data: Option<ResponseData>) -> Result<u64, HostError> {
        match data {
            Some(ResponseData::Handle { handle }) => Ok(handle),
            _ => Err(HostError::UnexpectedResponse),
        }
    }

    /// Marshal one fixed-arity call shape onto the wire.
    fn run(&self, name: &str, args: Vec<ScalarValue>) -> Result<ScalarValue, HostError> {
        let data = self.send_command(Command::RunMacro {
            name: name.to_string(),
            args,
        })?;
        match data {
            Some(ResponseData::Value { value }) => Ok(value),
            // a macro with no return value answers with an empty ok
            None => Ok(ScalarValue::Null),
            _ => Err(HostError::UnexpectedResponse),
        }
    }
}

impl AutomationHost for ProcessHost {
    fn configure_silent(&self) -> Result<(), HostError> {
        self.send_command(Command::Configure {
            visible: false,
            prompts: false,
        })?;
        Ok(())
    }

    fn open_documents(&self) -> Result<u64, HostError> {
        Self::expect_handle(self.send_command(Command::OpenDocuments)?)
    }

    fn open_document(&self, documents: u64, path: &str) -> Result<u64, HostError> {
        Self::expect_handle(self.send_command(Command::OpenDocument {
            documents,
            path: path.to_string(),
        })?)
    }

    fn sheets(&self, document: u64) -> Result<u64, HostError> {
        Self::expect_handle(self.send_command(Command::GetSheets { document })?)
    }

    fn run_macro0(&self, name: &str) -> Result<ScalarValue, HostError> {
        self.run(name, vec![])
    }

    fn run_macro1(&self, name: &str, a1: &ScalarValue) -> Result<ScalarValue, HostError> {
        self.run(name, vec![a1.clone()])
    }

    fn run_macro2(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(name, vec![a1.clone(), a2.clone()])
    }

    fn run_macro3(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(name, vec![a1.clone(), a2.clone(), a3.clone()])
    }

    fn run_macro4(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(name, vec![a1.clone(), a2.clone(), a3.clone(), a4.clone()])
    }

    fn run_macro5(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(
            name,
            vec![a1.clone(), a2.clone(), a3.clone(), a4.clone(), a5.clone()],
        )
    }

    fn run_macro6(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(
            name,
            vec![
                a1.clone(),
                a2.clone(),
                a3.clone(),
                a4.clone(),
                a5.clone(),
                a6.clone(),
            ],
        )
    }

    fn run_macro7(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
        a7: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(
            name,
            vec![
                a1.clone(),
                a2.clone(),
                a3.clone(),
                a4.clone(),
                a5.clone(),
                a6.clone(),
                a7.clone(),
            ],
        )
    }

    fn run_macro8(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
        a7: &ScalarValue,
        a8: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(
            name,
            vec![
                a1.clone(),
                a2.clone(),
                a3.clone(),
                a4.clone(),
                a5.clone(),
                a6.clone(),
                a7.clone(),
                a8.clone(),
            ],
        )
    }

    fn run_macro9(
        &self,
        name: &str,
        a1: &ScalarValue,
        a2: &ScalarValue,
        a3: &ScalarValue,
        a4: &ScalarValue,
        a5: &ScalarValue,
        a6: &ScalarValue,
        a7: &ScalarValue,
        a8: &ScalarValue,
        a9: &ScalarValue,
    ) -> Result<ScalarValue, HostError> {
        self.run(
            name,
            vec![
                a1.clone(),
                a2.clone(),
                a3.clone(),
                a4.clone(),
                a5.clone(),
                a6.clone(),
                a7.clone(),
                a8.clone(),
                a9.clone(),
            ],
        )
    }

    fn save_document_as(&self, document: u64, path: &str) -> Result<(), HostError> {
        self.send_command(Command::SaveDocumentAs {
            document,
            path: path.to_string(),
        })?;
        Ok(())
    }

    fn release(&self, handle: u64) -> Result<(), HostError> {
        self.send_command(Command::Release { handle })?;
        Ok(())
    }

    fn quit(&self) -> Result<(), HostError> {
        self.send_command(Command::Quit)?;

        // The launcher exits once the host application has quit.
        let mut child = self.child.lock().unwrap();
        let _ = child.wait();
        Ok(())
    }

    fn terminate(&self) -> Result<(), HostError> {
        let mut child = self.child.lock().unwrap();
        // kill fails once the child has been reaped — the outcome we want anyway
        if child.kill().is_ok() {
            let _ = child.wait();
        }
        tracing::debug!("automation host terminated");
        Ok(())
    }
}

/// Locate the host launcher next to the current executable.
fn find_host_exe() -> Option<PathBuf> {
    let mut exe = std::env::current_exe().ok()?;
    exe.pop();
    let candidate = exe.join(HOST_EXE_NAME);
    candidate.exists().then_some(candidate)
}
