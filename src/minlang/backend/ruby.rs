//! Reference backend: lowers the tree to Ruby source meant for `eval`.

use crate::minlang::ast::{Entity, Head};
use crate::minlang::compiler::Generator;
use crate::minlang::token::{Token, TokenType};

use super::Backend;

/// `Ruby_["puts"]` yields a lambda forwarding to a host method;
/// `Ruby_[".upcase"]` one that sends to its first argument.
const PRELUDE: &str = r#"Ruby_ = lambda { |cmd|
    if cmd[0] == "."
        lambda { |first, *args|
            first.send cmd[1..-1], *args
        }
    else
        lambda { |*args|
            send cmd, *args
        }
    end
}
"#;

pub struct Ruby;

impl Ruby {
    /// Operands that are operator nodes themselves get parenthesised so the
    /// tree's grouping survives Ruby's own precedence rules.
    fn operand(&self, gen: &mut Generator, entity: &Entity) -> String {
        let compiled = gen.compile_entity(entity);
        match entity {
            Entity::Node(node) if matches!(node.head, Head::Operator(_) | Head::UnaryOperator(_)) => {
                format!("({})", compiled)
            }
            _ => compiled,
        }
    }

    fn set_global(&self, gen: &mut Generator, op: &Token, operands: &[Entity]) -> String {
        let [name, value] = operands else {
            gen.warn(format!("`{}` expects a name and a value", op.value), Some(op.offset));
            return String::new();
        };
        let name = match name {
            Entity::Leaf(token) => token.value.clone(),
            Entity::Node(_) => {
                gen.warn("assignment target is not a plain name", Some(op.offset));
                gen.compile_entity(name)
            }
        };
        format!("{} = {}", name, gen.compile_entity(value))
    }
}

impl Backend for Ruby {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn prologue(&self) -> Vec<String> {
        vec![PRELUDE.to_string()]
    }

    fn emit_value(&self, gen: &mut Generator, value: &Token) -> String {
        if value.ttype != TokenType::Abstract {
            return value.value.clone();
        }
        let index = value.value.trim_start_matches('_');
        if index.is_empty() {
            gen.warn(format!("placeholder `{}` has no argument index", value.value), Some(value.offset));
            return String::from("nil");
        }
        format!("_abstract[{}]", index)
    }

    fn emit_call(&self, gen: &mut Generator, callee: &Entity, args: &[Entity]) -> String {
        let args = args.iter()
            .map(|arg| gen.compile_entity(arg))
            .collect::<Vec<_>>();

        let callee = match callee {
            Entity::Node(_) => format!("({})", gen.compile_entity(callee)),
            Entity::Leaf(token) if token.ttype == TokenType::Abstract => gen.compile_entity(callee),
            Entity::Leaf(token) => token.value.clone(),
        };

        if callee == "If" {
            if let [condition, then, otherwise] = args.as_slice() {
                return format!("(({}) ? ({}) : ({}))", condition, then, otherwise);
            }
            gen.warn(format!("`If` takes 3 arguments, got {}", args.len()), None);
        }
        format!("{}[{}]", callee, args.join(", "))
    }

    fn emit_lambda(&self, gen: &mut Generator, body: &[Entity]) -> String {
        let inner = body.iter()
            .map(|statement| gen.compile_entity(statement))
            .collect::<Vec<_>>()
            .join(";");
        format!("lambda {{ |*args|\n_abstract=[nil,*args]\n{}\n}}", inner)
    }

    fn emit_array(&self, gen: &mut Generator, elements: &[Entity]) -> String {
        let elements = elements.iter()
            .map(|element| gen.compile_entity(element))
            .collect::<Vec<_>>();
        format!("[{}]", elements.join(", "))
    }

    fn emit_operator(&self, gen: &mut Generator, op: &Token, operands: &[Entity]) -> String {
        match op.value.as_str() {
            ":=" => self.set_global(gen, op, operands),
            "=" => operands.iter()
                .map(|operand| self.operand(gen, operand))
                .collect::<Vec<_>>()
                .join("=="),
            "+" | "-" | "/" | "*" => operands.iter()
                .map(|operand| self.operand(gen, operand))
                .collect::<Vec<_>>()
                .join(op.value.as_str()),
            _ => {
                gen.warn(format!("operator `{}` has no ruby lowering", op.value), Some(op.offset));
                String::new()
            }
        }
    }

    fn emit_unary_operator(&self, gen: &mut Generator, op: &Token, operand: &Entity) -> String {
        match op.value.as_str() {
            "-" | "~" | "*" => format!("{}{}", op.value, self.operand(gen, operand)),
            _ => {
                gen.warn(format!("unary operator `{}` has no ruby lowering", op.value), Some(op.offset));
                String::new()
            }
        }
    }
}
