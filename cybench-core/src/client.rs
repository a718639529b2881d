use cybench_script::UnitOfWork;

/// Failure classification recorded per worker. Category names are the
/// user-facing kebab-case strings in reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorCategory {
    /// Script-level failure (undefined variable, unknown function). Parse
    /// errors surface before any worker starts; this covers evaluation-time
    /// failures of the same class.
    UserSyntax,
    Auth,
    CypherSyntax,
    Transient,
    Constraint,
    Io,
}

impl ErrorCategory {
    pub const ALL: [Self; 6] = [
        Self::UserSyntax,
        Self::Auth,
        Self::CypherSyntax,
        Self::Transient,
        Self::Constraint,
        Self::Io,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Retried with backoff as part of the same logical transaction.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Io)
    }

    /// Fatal errors terminate the worker and force a non-zero exit.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::UserSyntax | Self::Auth | Self::CypherSyntax)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {message}")]
pub struct ClientError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ClientError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Seam between the engine and a concrete Cypher driver. One call executes
/// one unit of work as a single explicit transaction: statements run in
/// document order, commit on success, rollback on the first failure.
pub trait CypherClient: Send + Sync + 'static {
    fn execute(
        &self,
        database: &str,
        unit: &UnitOfWork,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
