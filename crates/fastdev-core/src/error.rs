//! Error types shared by every planner

use thiserror::Error;

/// Errors raised while inspecting a project or synthesizing a command
#[derive(Error, Debug)]
pub enum FastDevError {
    /// Manifest (or another marker file) could not be located
    #[error("{0}")]
    Environment(String),

    /// A dependency or version line could not be split as expected
    #[error("Failed to separate by '='@line {line}: {content}")]
    Parse { line: usize, content: String },

    /// A version-bearing file was expected but none was found
    #[error("{0}")]
    VersionFile(String),

    /// User supplied a value outside the accepted set
    #[error("{0}")]
    InvalidInput(String),

    /// Refused to tag because the work tree has uncommitted changes
    #[error("Please run git commit to make sure working tree is clean!")]
    DirtyWorkTree,

    /// An external command exited with a non-zero code
    #[error("Command exited with code {code}: {command}")]
    CommandFailed { command: String, code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FastDevError {
    /// Process exit code this error should map to
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, FastDevError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_line() {
        let err = FastDevError::Parse {
            line: 3,
            content: "[tool.isort]".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to separate by '='@line 3: [tool.isort]"
        );
    }

    #[test]
    fn test_exit_code() {
        let err = FastDevError::CommandFailed {
            command: "false".to_string(),
            code: 3,
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(FastDevError::DirtyWorkTree.exit_code(), 1);
    }
}
