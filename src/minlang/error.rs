use core::fmt;

use serde::Serialize;
use thiserror::Error;

use super::token::Location;

/// Malformed program structure. Fatal to the current compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: Option<usize>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: Option<usize>) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    pub fn expected_closer(closer: &str, offset: Option<usize>) -> Self {
        Self::new(format!("Expected matching `{closer}`"), offset)
    }

    /// Message with the `line,column` of the offending token, when known.
    pub fn render(&self, source: &str) -> String {
        match self.offset {
            Some(offset) => format!("{} @ {}", self.message, Location::from_offset(source, offset)),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("No such compile target {name:?} (known: {})", .known.join(", "))]
    UnknownBackend { name: String, known: Vec<&'static str> },
}

impl CompileError {
    pub fn render(&self, source: &str) -> String {
        match self {
            Self::Syntax(e) => format!("syntax error: {}", e.render(source)),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = core::result::Result<T, CompileError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Shunt,
    Build,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shunt => write!(f, "SHUNT"),
            Self::Build => write!(f, "AST"),
            Self::Generate => write!(f, "COMPILE"),
        }
    }
}

/// Something reached a stage that has no handler for it. Output for that
/// piece is partial or empty, the rest of the compile carries on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    pub offset: Option<usize>,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>, offset: Option<usize>) -> Self {
        Self {
            stage,
            message: message.into(),
            offset,
        }
    }

    pub fn render(&self, source: &str) -> String {
        match self.offset {
            Some(offset) => format!("{} @ {}", self, Location::from_offset(source, offset)),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_points_at_source() {
        let err = SyntaxError::expected_closer(")", Some(4));
        assert_eq!(err.to_string(), "Expected matching `)`");
        assert_eq!(err.render("x :=\n(1"), "Expected matching `)` @ 1,5");
        assert_eq!(err.render("ab\ncd"), "Expected matching `)` @ 2,2");
    }

    #[test]
    fn unknown_backend_lists_known_targets() {
        let err = CompileError::UnknownBackend {
            name: String::from("lua"),
            known: vec!["ruby"],
        };
        assert_eq!(err.to_string(), "No such compile target \"lua\" (known: ruby)");
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::new(Stage::Build, "no handler for Token(other, \"@\", 2)", Some(2));
        assert_eq!(diag.to_string(), "[AST] no handler for Token(other, \"@\", 2)");
        assert_eq!(diag.render("1 @"), "[AST] no handler for Token(other, \"@\", 2) @ 1,3");
    }
}
