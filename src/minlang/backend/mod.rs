use super::ast::Entity;
use super::compiler::Generator;
use super::error::CompileError;
use super::token::Token;

pub mod ruby;

pub const DEFAULT_BACKEND: &str = "ruby";

/// A compile target. The generic [`Generator`] walks the tree and hands each
/// node to the matching hook; hooks call back into the generator for their
/// children.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fragments placed ahead of the compiled program.
    fn prologue(&self) -> Vec<String> {
        vec![]
    }

    /// Fragments placed after the compiled program.
    fn epilogue(&self) -> Vec<String> {
        vec![]
    }

    fn separator(&self) -> &'static str {
        "\n\n"
    }

    fn emit_value(&self, gen: &mut Generator, value: &Token) -> String;
    fn emit_call(&self, gen: &mut Generator, callee: &Entity, args: &[Entity]) -> String;
    fn emit_lambda(&self, gen: &mut Generator, body: &[Entity]) -> String;
    fn emit_array(&self, gen: &mut Generator, elements: &[Entity]) -> String;
    fn emit_operator(&self, gen: &mut Generator, op: &Token, operands: &[Entity]) -> String;
    fn emit_unary_operator(&self, gen: &mut Generator, op: &Token, operand: &Entity) -> String;
}

pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(ruby::Ruby),
    ]
}

pub fn find_backend(name: &str) -> Result<Box<dyn Backend>, CompileError> {
    let mut known = vec![];
    for backend in backends() {
        if backend.name() == name {
            return Ok(backend);
        }
        known.push(backend.name());
    }
    Err(CompileError::UnknownBackend {
        name: name.to_string(),
        known,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_registered() {
        let backend = find_backend(DEFAULT_BACKEND).expect("Default backend missing.");
        assert_eq!(backend.name(), "ruby");
    }

    #[test]
    fn unknown_backend_is_reported() {
        let err = find_backend("cobol").err().expect("Expected an unknown backend.");
        assert_eq!(err, CompileError::UnknownBackend {
            name: String::from("cobol"),
            known: vec!["ruby"],
        });
    }
}
