use core::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use super::error::{Diagnostic, SyntaxError, Stage};
use super::shunter::{ArityKind, ShuntEntity};
use super::token::{Token, TokenType};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Head {
    /// Binary operator, always two children.
    Operator(Token),
    /// Prefix operator, always one child.
    UnaryOperator(Token),
    /// One child per statement in the body.
    Lambda,
    Array,
    /// Anything applied with `[...]`: a name, a literal or another node.
    Call(Box<Entity>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Node {
    pub head: Head,
    pub children: Vec<Entity>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Leaf(Token),
    Node(Node),
}

impl Node {
    pub fn new(head: Head, children: Vec<Entity>) -> Self {
        Self { head, children }
    }

    fn render(&self, level: usize) -> String {
        let prefix = "  ".repeat(level);
        let mut out = format!("{}{}\n", prefix, self.head);
        for child in &self.children {
            out.push_str(&prefix);
            out.push_str(" -- ");
            match child {
                Entity::Node(node) => out.push_str(node.render(level + 1).trim()),
                Entity::Leaf(token) => out.push_str(&token.to_string()),
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operator(token) | Self::UnaryOperator(token) => write!(f, "{}", token),
            Self::Lambda => write!(f, "lambda"),
            Self::Array => write!(f, "array"),
            Self::Call(callee) => write!(f, "{}", callee.to_string().trim()),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(0))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(token) => write!(f, "{}", token),
            Self::Node(node) => write!(f, "{}", node),
        }
    }
}

#[derive(Debug, Default)]
pub struct Built {
    pub forest: Vec<Entity>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
struct Builder {
    data_stack: Vec<Entity>,
    /// Outer operand stacks, one per lambda currently open.
    stack_stack: Vec<Vec<Entity>>,
    diagnostics: Vec<Diagnostic>,
}

impl Builder {
    fn pop_operands(
        &mut self,
        n: usize,
        what: impl FnOnce() -> String,
        offset: Option<usize>,
    ) -> Result<Vec<Entity>, SyntaxError> {
        if self.data_stack.len() < n {
            return Err(SyntaxError::new(
                format!("Expected {} operand(s) for {}, found {}", n, what(), self.data_stack.len()),
                offset,
            ));
        }
        let at = self.data_stack.len() - n;
        Ok(self.data_stack.split_off(at))
    }

    fn apply_operator(&mut self, token: Token) -> Result<(), SyntaxError> {
        let arity = if token.ttype == TokenType::UnaryOperator { 1 } else { 2 };
        let children = self.pop_operands(arity, || format!("`{}`", token.value), Some(token.offset))?;
        let head = if arity == 1 {
            Head::UnaryOperator(token)
        } else {
            Head::Operator(token)
        };
        self.data_stack.push(Entity::Node(Node::new(head, children)));
        Ok(())
    }

    fn step(&mut self, entity: ShuntEntity) -> Result<(), SyntaxError> {
        match entity {
            ShuntEntity::Token(token) if token.ttype.is_data() => {
                self.data_stack.push(Entity::Leaf(token));
            }
            ShuntEntity::Token(token) if token.ttype.is_operator() => {
                self.apply_operator(token)?;
            }
            ShuntEntity::Token(token) if token.ttype == TokenType::LambdaStart => {
                self.stack_stack.push(std::mem::take(&mut self.data_stack));
            }
            ShuntEntity::Token(token) if token.ttype == TokenType::LambdaEnd => {
                let Some(outer) = self.stack_stack.pop() else {
                    return Err(SyntaxError::new("Unmatched `}`", Some(token.offset)));
                };
                let body = std::mem::replace(&mut self.data_stack, outer);
                self.data_stack.push(Entity::Node(Node::new(Head::Lambda, body)));
            }
            ShuntEntity::Arity { kind: ArityKind::CallFunc, count } => {
                let args = self.pop_operands(count, || String::from("a call"), None)?;
                let callee = self.data_stack.pop().ok_or_else(|| {
                    SyntaxError::new("Expected something to call before `[`", None)
                })?;
                self.data_stack.push(Entity::Node(Node::new(Head::Call(Box::new(callee)), args)));
            }
            ShuntEntity::Arity { kind: ArityKind::GatherArray, count } => {
                let elements = self.pop_operands(count, || String::from("an array"), None)?;
                self.data_stack.push(Entity::Node(Node::new(Head::Array, elements)));
            }
            ShuntEntity::Token(token) => {
                let diagnostic = Diagnostic::new(
                    Stage::Build,
                    format!("no handler for {}", token),
                    Some(token.offset),
                );
                warn!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
            }
        }
        Ok(())
    }
}

/// Reduces shunted entities into a forest of top-level statements.
pub fn build(entities: Vec<ShuntEntity>) -> Result<Built, SyntaxError> {
    let mut builder = Builder::default();
    for entity in entities {
        builder.step(entity)?;
    }
    if !builder.stack_stack.is_empty() {
        return Err(SyntaxError::expected_closer("}", None));
    }

    debug!("built {} top-level entries", builder.data_stack.len());
    Ok(Built {
        forest: builder.data_stack,
        diagnostics: builder.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use crate::minlang::{lexer::lex, shunter::shunt};

    use super::*;

    fn build_code(code: &str) -> Result<Built, SyntaxError> {
        build(shunt(lex(code))?.entities)
    }

    fn forest(code: &str) -> Vec<Entity> {
        let built = build_code(code).expect("Unable to build code.");
        assert!(built.diagnostics.is_empty(), "{:?}", built.diagnostics);
        built.forest
    }

    /// Child counts, pre-order, with the head kind of each node.
    fn shape(entity: &Entity) -> String {
        match entity {
            Entity::Leaf(token) => token.value.clone(),
            Entity::Node(node) => {
                let head = match &node.head {
                    Head::Operator(token) | Head::UnaryOperator(token) => token.value.clone(),
                    Head::Lambda => String::from("lambda"),
                    Head::Array => String::from("array"),
                    Head::Call(callee) => format!("call {}", shape(callee)),
                };
                let children = node.children.iter().map(shape).collect::<Vec<_>>();
                format!("({} {})", head, children.join(" "))
            }
        }
    }

    fn shapes(code: &str) -> Vec<String> {
        forest(code).iter().map(shape).collect()
    }

    #[test]
    fn assignment_has_name_and_value() {
        let trees = forest("x := 1+2");
        assert_eq!(trees.len(), 1);
        let Entity::Node(node) = &trees[0] else {
            panic!("expected a node");
        };
        assert!(matches!(&node.head, Head::Operator(token) if token.value == ":="));
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0], Entity::Leaf(Token::new(TokenType::Word, "x", 0)));
        assert_eq!(shape(&node.children[1]), "(+ 1 2)");
    }

    #[test]
    fn lambda_children_are_statements() {
        assert_eq!(shapes("{1;2;3}"), ["(lambda 1 2 3)"]);
        assert_eq!(shapes("{}"), ["(lambda )"]);
    }

    #[test]
    fn nested_lambdas_restore_outer_stack() {
        assert_eq!(shapes("a; { {1;2}; 3 }; b"), ["a", "(lambda (lambda 1 2) 3)", "b"]);
        assert_eq!(shapes("f := {g := {_1}; g[_1]}"), [
            "(:= f (lambda (:= g (lambda _1)) (call g _1)))",
        ]);
    }

    #[test]
    fn calls_and_arrays() {
        assert_eq!(shapes("f[1, 2]"), ["(call f 1 2)"]);
        assert_eq!(shapes("f[]"), ["(call f )"]);
        assert_eq!(shapes("f[1][2]"), ["(call (call f 1) 2)"]);
        assert_eq!(shapes("[1, [2, 3]]"), ["(array 1 (array 2 3))"]);
        assert_eq!(shapes("{_1}[4]"), ["(call (lambda _1) 4)"]);
    }

    #[test]
    fn unary_operators_take_one_child() {
        assert_eq!(shapes("-x + 2"), ["(+ (- x) 2)"]);
    }

    #[test]
    fn missing_operands_fail() {
        assert!(build_code("1+").is_err());
        assert!(build_code("-").is_err());
    }

    #[test]
    fn stray_entities_are_reported() {
        let entities = vec![
            ShuntEntity::Token(Token::new(TokenType::Number, "1", 0)),
            ShuntEntity::Token(Token::new(TokenType::Comma, ",", 1)),
        ];
        let built = build(entities).expect("Unable to build entities.");
        assert_eq!(built.forest.len(), 1);
        assert_eq!(built.diagnostics.len(), 1);
        assert_eq!(built.diagnostics[0].stage, Stage::Build);
    }

    #[test]
    fn tree_display() {
        let trees = forest("x := f[1]");
        let expected = "Token(operator, \":=\", 2)\n -- Token(word, \"x\", 0)\n -- Token(word, \"f\", 5)\n   -- Token(number, \"1\", 7)\n";
        assert_eq!(trees[0].to_string(), expected);
    }
}
