use serde::Serialize;
use tracing::{debug, warn};

use super::ast::{self, Built, Entity, Head, Node};
use super::backend::{find_backend, Backend};
use super::error::{Diagnostic, Result, Stage, SyntaxError};
use super::lexer::lex;
use super::shunter::{self, Shunted};
use super::token::Token;

#[derive(Debug, Serialize)]
pub struct Compiled {
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks a forest and dispatches every node to the backend hook for its
/// head. Backends call [`Generator::compile_entity`] for their children.
pub struct Generator<'b> {
    backend: &'b dyn Backend,
    diagnostics: Vec<Diagnostic>,
}

impl<'b> Generator<'b> {
    pub fn new(backend: &'b dyn Backend) -> Self {
        Self {
            backend,
            diagnostics: vec![],
        }
    }

    pub fn backend(&self) -> &'b dyn Backend {
        self.backend
    }

    /// Records a piece of the program the backend could not lower.
    pub fn warn(&mut self, message: impl Into<String>, offset: Option<usize>) {
        let diagnostic = Diagnostic::new(Stage::Generate, message, offset);
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn compile_entity(&mut self, entity: &Entity) -> String {
        match entity {
            Entity::Leaf(token) => {
                let backend = self.backend;
                backend.emit_value(self, token)
            }
            Entity::Node(node) => self.compile_node(node),
        }
    }

    pub fn compile_node(&mut self, node: &Node) -> String {
        let backend = self.backend;
        match &node.head {
            Head::Operator(op) => backend.emit_operator(self, op, &node.children),
            Head::UnaryOperator(op) => match node.children.first() {
                Some(operand) => backend.emit_unary_operator(self, op, operand),
                None => {
                    self.warn(format!("unary `{}` without an operand", op.value), Some(op.offset));
                    String::new()
                }
            },
            Head::Lambda => backend.emit_lambda(self, &node.children),
            Head::Array => backend.emit_array(self, &node.children),
            Head::Call(callee) => backend.emit_call(self, callee, &node.children),
        }
    }

    pub fn generate(mut self, forest: &[Entity]) -> Compiled {
        let backend = self.backend;
        let mut parts = backend.prologue();
        for entity in forest {
            let part = self.compile_entity(entity);
            parts.push(part);
        }
        parts.extend(backend.epilogue());

        debug!("generated {} fragments for {}", parts.len(), backend.name());
        Compiled {
            output: parts.join(backend.separator()),
            diagnostics: self.diagnostics,
        }
    }
}

pub fn tokenize(code: &str) -> Vec<Token> {
    lex(code)
}

pub fn shunt(code: &str) -> core::result::Result<Shunted, SyntaxError> {
    shunter::shunt(lex(code))
}

/// Builds the forest for `code`, carrying shunt diagnostics along.
pub fn ast(code: &str) -> core::result::Result<Built, SyntaxError> {
    let shunted = shunt(code)?;
    let mut built = ast::build(shunted.entities)?;
    let mut diagnostics = shunted.diagnostics;
    diagnostics.append(&mut built.diagnostics);
    built.diagnostics = diagnostics;
    Ok(built)
}

pub fn compile_with(code: &str, backend: &dyn Backend) -> Result<Compiled> {
    let built = ast(code)?;
    let mut compiled = Generator::new(backend).generate(&built.forest);
    let mut diagnostics = built.diagnostics;
    diagnostics.append(&mut compiled.diagnostics);
    compiled.diagnostics = diagnostics;
    Ok(compiled)
}

/// Full pipeline. The backend is resolved before anything is parsed.
pub fn compile(code: &str, backend_name: &str) -> Result<Compiled> {
    let backend = find_backend(backend_name)?;
    compile_with(code, backend.as_ref())
}
