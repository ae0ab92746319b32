use crate::usage::InfoPage;

/// Invalid option arguments that end the scan at once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FatalError {
    #[error("unknown parse option '{0}', use -o or --list-parse-options to see valid parse options")]
    UnknownParseOption(String),

    #[error("unknown warning '{0}', use -i or --list-warnings to see valid warnings")]
    UnknownWarning(String),

    #[error("parse define '{0}' given more than once")]
    DuplicateDefine(String),

    #[error("missing parse define name in '--define={0}'")]
    EmptyDefine(String),

    #[error("invalid argument encoding in '{0}'")]
    InvalidEncoding(String),
}

/// Reasons to end the program during argument processing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Halt {
    /// An informational page was requested; print it and exit successfully.
    #[error("{0:?} requested")]
    Show(InfoPage),

    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// Scan errors were reported.
    #[error("{errors} command line error(s)")]
    Usage { errors: usize },
}

impl Halt {
    pub fn exit_code(&self) -> i32 {
        match self {
            Halt::Show(_) => 0,
            Halt::Fatal(_) | Halt::Usage { .. } => 1,
        }
    }
}

/// Message printed after command line errors.
pub const HELP_HINT: &str = "try 'qrun -h' or 'qrun --help' for more information.";
