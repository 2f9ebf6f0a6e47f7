//! Drive an external office-automation host: open a document, run its
//! embedded macros, save the result, and guarantee every host-side handle
//! is released — newest first — on every exit path.
//!
//! The host is reached through a spawned launcher process speaking
//! newline-delimited JSON (see the `macrodrive-protocol` crate). Host-side
//! objects are reference-counted, not garbage-collected: each one the
//! session acquires is registered with an ordered [`DisposalRegistry`] in
//! the same step, and teardown releases the chain in strict reverse
//! acquisition order before force-terminating the host process.
//!
//! # Architecture
//!
//! ```text
//! Your Rust code (dedicated blocking worker)
//!     └── AutomationSession (this crate)
//!           ├── DisposalRegistry — ordered release of acquired handles
//!           └── ProcessHost — spawned host launcher, JSON over stdio
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use macrodrive::{AutomationSession, HostConfig};
//!
//! fn main() -> Result<(), macrodrive::SessionError> {
//!     let mut session = AutomationSession::launch(
//!         HostConfig::default(),
//!         "/data/template.xlsm",
//!     )?;
//!
//!     let result = session.invoke("ThisWorkbook.TestMacro4", &["a1".into(), "a2".into()])?;
//!     println!("macro returned {result}");
//!
//!     session.save_as("/data/result.xlsm")?;
//!     session.close()?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod host;
pub mod registry;
pub mod session;

pub use error::{HostError, RegistryError, ReleaseFailure, SessionError, TeardownError};
pub use host::{AutomationHost, HostConfig, ProcessHost};
pub use macrodrive_protocol::ScalarValue;
pub use registry::DisposalRegistry;
pub use session::AutomationSession;
