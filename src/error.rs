//! Error taxonomy shared by the report pipeline

#[derive(Debug)]
pub enum ReportError {
    /// Malformed configuration or a value no metric can be computed from
    InvalidArgument(String),
    /// The event source could not produce data; the run aborts
    UpstreamUnavailable(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl ReportError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ReportError::InvalidArgument(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ReportError::UpstreamUnavailable(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ReportError::InvalidArgument(_))
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Serialization(err)
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::InvalidArgument(msg) => write!(f, "{}", msg),
            ReportError::UpstreamUnavailable(msg) => write!(f, "Event source unavailable: {}", msg),
            ReportError::Io(e) => write!(f, "IO error: {}", e),
            ReportError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
