//! Error type of the crate.
//!
//! Malformed input is reported as soon as it is detected. Constructs that are merely
//! unsatisfiable (unreachable preconditions, violated static conditions, ...) are never errors:
//! the affected actions are dropped and the drop is logged.
use thiserror::Error;

/// Everything that can go wrong while grounding or translating a task
#[derive(Debug, Error)]
pub enum Error {
    /// The input task references something that does not exist or breaks a structural convention
    #[error("invalid task: {0}")]
    InvalidTask(String),
    /// A metric or goal refers to a grounded variable that was never created
    #[error("unknown variable {0}")]
    UnknownVariable(String),
    /// A quantified parameter is used outside of the quantifier binding it
    #[error("unbound quantified parameter ?{0}")]
    UnboundParameter(usize),
    /// Constant folding hit a division by zero
    #[error("division by zero in {0}")]
    DivisionByZero(String),
    /// A value is not part of the domain of the variable it is assigned to
    #[error("invalid value {value} for variable {variable}")]
    InvalidValue {
        /// name of the variable
        variable: String,
        /// name of the rejected value
        value: String,
    },
    /// A negated value was requested for a variable whose domain is not two-valued
    #[error("unable to negate a value of variable {0}, its domain is not two-valued")]
    NoOppositeValue(String),
    /// Two different initial values were given for the same variable at the same time point
    #[error("contradictory initial value {value} at time {time} for variable {variable}")]
    ContradictoryInitialValue {
        /// name of the variable
        variable: String,
        /// the rejected value
        value: f64,
        /// time point of the value
        time: f64,
    },
    /// More variables or values than the packed `(variable, value)` encoding can address
    #[error("too many {what}s for the packed encoding (index {index})")]
    CapacityExceeded {
        /// what ran out of space
        what: &'static str,
        /// the offending index
        index: usize,
    },
    /// Reading or writing a file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The input is not valid JSON for a task
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type using the crate's [Error]
pub type Result<T> = std::result::Result<T, Error>;
