use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Parse error: invalid {rule}: {input}")]
    Parse { rule: String, input: String, message: String },
    #[error("Arity error: template has {holes} hole(s) but {fillers} filler value(s) were given")]
    Arity { holes: usize, fillers: usize },
    #[error("Cannot assert a fact that has variables or wildcards: {0}")]
    UngroundedAssert(String),
    #[error("Invalid evidence: with variables {with_variables:?}, not in the database {missing:?}")]
    InvalidEvidence { with_variables: Vec<String>, missing: Vec<String> },
    #[error("Unrecognized wire term: {0}")]
    UnknownWireTerm(String),
    #[error("There is already a client whose id is {0}")]
    DuplicateClientId(String),
    #[error("Internal invariant violated: {0}")]
    MatchFault(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl RoomError {
    /// True for errors caused by the data a caller handed in, as opposed to
    /// broken invariants or infrastructure failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::Arity { .. }
                | Self::UngroundedAssert(_)
                | Self::InvalidEvidence { .. }
                | Self::UnknownWireTerm(_)
                | Self::DuplicateClientId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RoomError>;

// Helper conversions
impl From<config::ConfigError> for RoomError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl From<reqwest::Error> for RoomError {
    fn from(e: reqwest::Error) -> Self { Self::Transport(e.to_string()) }
}

impl<T> From<std::sync::PoisonError<T>> for RoomError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
