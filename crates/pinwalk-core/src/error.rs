use std::fmt;

/// Machine-readable error codes for fatal scan failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingRootLocator,
    ConfigParseError,
    RootAcquisitionFailed,
    ActionAcquisitionFailed,
    MalformedReference,
    DocumentParseError,
    WorkspaceUnavailable,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingRootLocator => "E1001",
            Self::ConfigParseError => "E1002",
            Self::RootAcquisitionFailed => "E2001",
            Self::ActionAcquisitionFailed => "E2002",
            Self::MalformedReference => "E3001",
            Self::DocumentParseError => "E3002",
            Self::WorkspaceUnavailable => "E5001",
            Self::LockContention => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingRootLocator => "No repository locator given",
            Self::ConfigParseError => "Config file parse error",
            Self::RootAcquisitionFailed => "Root repository could not be fetched",
            Self::ActionAcquisitionFailed => "Action repository could not be fetched",
            Self::MalformedReference => "Malformed action reference",
            Self::DocumentParseError => "Workflow or action document parse error",
            Self::WorkspaceUnavailable => "Scan workspace unavailable",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingRootLocator => Some("Pass the repository URL: `pinwalk scan <REPO_URL>`."),
            Self::ConfigParseError => Some("Fix syntax in pinwalk.toml and retry."),
            Self::RootAcquisitionFailed => {
                Some("Check the URL, network access, and that `git` is installed.")
            }
            Self::ActionAcquisitionFailed => None,
            Self::MalformedReference => Some("Use the `owner/name@version` form."),
            Self::DocumentParseError => None,
            Self::WorkspaceUnavailable => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Another pinwalk scan is using this workspace; retry or pick another one.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
