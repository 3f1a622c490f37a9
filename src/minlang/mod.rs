pub mod ast;
pub mod backend;
pub mod compiler;
pub mod error;
mod lexer;
pub mod shunter;
pub mod token;

pub use compiler::{compile, Compiled};
pub use error::{CompileError, Diagnostic, SyntaxError};
