use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a module from being compiled.
///
/// None of these are recoverable: a function that hits any of them produces
/// no assembly at all.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("verification failed in `{function}`: {message}")]
    Verify { function: String, message: String },

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("unsupported operation `{opcode}` in function `{function}`")]
    Unsupported { function: String, opcode: String },

    /// Coloring ran out of simplifiable nodes. Kept apart from every other
    /// failure so a spilling allocator can intercept exactly this case.
    #[error(
        "register allocation infeasible for `{function}` with {registers} registers (stuck on: {})",
        remaining.join(", ")
    )]
    AllocationInfeasible {
        function: String,
        registers: usize,
        remaining: Vec<String>,
    },

    #[error("internal consistency violation in `{function}`: {message}")]
    Internal { function: String, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn internal(function: &str, message: impl Into<String>) -> Self {
        Error::Internal {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
