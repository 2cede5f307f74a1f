//! Error & context layer.
//!
//! A single structured type carrying operation, resource, a context bag
//! and remediation suggestions, rather than one `thiserror` variant per
//! subsystem.

use std::fmt;

/// Coarse classification used by callers to decide presentation and
/// whether to offer operation-specific guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Network,
    Dns,
    Storage,
    Acme,
    Certificate,
    Validation,
    Authentication,
    /// Internal-only: a cancellation token tripped. Presented to users as
    /// `Validation` but kept distinct so the orchestrator can tell "user
    /// cancelled" apart from "bad input" without guessing from the
    /// message text.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Network => "NETWORK",
            ErrorKind::Dns => "DNS",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Acme => "ACME",
            ErrorKind::Certificate => "CERTIFICATE",
            ErrorKind::Validation | ErrorKind::Cancelled => "VALIDATION",
            ErrorKind::Authentication => "AUTHENTICATION",
        };
        write!(f, "{tag}")
    }
}

/// The tagged error value every fallible operation in this workspace
/// returns.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub operation: String,
    pub resource: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    pub context: Vec<(String, String)>,
    pub suggestions: Vec<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation: operation.into(),
            resource: None,
            message: message.into(),
            source: None,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn config(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, operation, message)
    }

    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, operation, message)
    }

    pub fn dns(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dns, operation, message)
    }

    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, operation, message)
    }

    pub fn acme(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Acme, operation, message)
    }

    pub fn certificate(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Certificate, operation, message)
    }

    pub fn validation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, operation, message)
    }

    pub fn authentication(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, operation, message)
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, operation, "operation cancelled")
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The one-line form printed at error level.
    pub fn short(&self) -> String {
        match &self.resource {
            Some(r) => format!("[{}] {}: {} ({r})", self.kind, self.operation, self.message),
            None => format!("[{}] {}: {}", self.kind, self.operation, self.message),
        }
    }

    /// The multi-line "detailed" form printed at process end.
    pub fn detailed(&self) -> String {
        let mut out = self.short();
        if let Some(source) = &self.source {
            out.push_str(&format!("\n  caused by: {source}"));
        }
        for (k, v) in &self.context {
            out.push_str(&format!("\n  {k}: {v}"));
        }
        for s in &self.suggestions {
            out.push_str(&format!("\n  suggestion: {s}"));
        }
        out
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::storage("io", e.to_string()).with_source(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
