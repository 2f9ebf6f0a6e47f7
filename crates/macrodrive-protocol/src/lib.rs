//! Shared protocol types for communication between the native client
//! and the automation host launcher process.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! Handles are opaque IDs minted by the host process; the client releases them
//! explicitly, and the host keeps the named object alive until it does.

use serde::{Deserialize, Serialize};

/// Upper bound on macro arity.
///
/// The host's invocation primitive offers one call shape per argument count,
/// zero through nine, and nothing beyond; `RunMacro` never carries a longer
/// argument list.
pub const MAX_MACRO_ARITY: usize = 9;

/// A command sent from the client to the automation host process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the host process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Start the host application instance.
    Init,

    /// Configure the host for unattended automation: whether its windows are
    /// rendered and whether it may raise interactive prompts.
    Configure { visible: bool, prompts: bool },

    /// Acquire the document-container handle.
    OpenDocuments,

    /// Open an existing document through the container. Returns a handle.
    OpenDocument { documents: u64, path: String },

    /// Acquire the sheet-collection handle of an open document.
    GetSheets { document: u64 },

    /// Invoke a macro by qualified name (`<document-name>!<macro>`).
    ///
    /// `args` carries at most [`MAX_MACRO_ARITY`] values; the client only
    /// ever marshals one of the host's fixed-arity call shapes into it.
    RunMacro { name: String, args: Vec<ScalarValue> },

    /// Persist an open document at a new path.
    SaveDocumentAs { document: u64, path: String },

    /// Drop one host-side reference.
    Release { handle: u64 },

    /// Quit the host application instance.
    Quit,
}

/// A response sent from the host process back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to a newly acquired host-side object.
    Handle { handle: u64 },
    /// The value a macro returned.
    Value { value: ScalarValue },
}

/// A scalar that can cross the macro boundary in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Number(n)
    }
}

impl From<i32> for ScalarValue {
    fn from(n: i32) -> Self {
        ScalarValue::Number(n as f64)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Number(n as f64)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "<null>"),
            ScalarValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            ScalarValue::Number(n) => write!(f, "{n}"),
            ScalarValue::String(s) => write!(f, "{s}"),
        }
    }
}
