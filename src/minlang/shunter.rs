use core::fmt;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::error::{Diagnostic, SyntaxError, Stage};
use super::token::{precedence, Associativity, Token, TokenType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArityKind {
    CallFunc,
    GatherArray,
}

impl fmt::Display for ArityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallFunc => write!(f, "call_func"),
            Self::GatherArray => write!(f, "gather_array"),
        }
    }
}

/// One element of the shunted output: a token in postfix position, or a
/// marker saying how many preceding sub-trees belong to a call or array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum ShuntEntity {
    Token(Token),
    Arity { kind: ArityKind, count: usize },
}

impl ShuntEntity {
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Token(token) => Some(token),
            Self::Arity { .. } => None,
        }
    }
}

impl fmt::Display for ShuntEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(token) => write!(f, "MSE({})", token),
            Self::Arity { kind, count } => write!(f, "MSE({}, {})", kind, count),
        }
    }
}

#[derive(Debug, Default)]
pub struct Shunted {
    pub entities: Vec<ShuntEntity>,
    pub diagnostics: Vec<Diagnostic>,
}

fn closer_for(ttype: TokenType) -> Option<&'static str> {
    match ttype {
        TokenType::ParenOpen => Some(")"),
        TokenType::BracketOpen | TokenType::ArrayStart => Some("]"),
        TokenType::LambdaStart => Some("}"),
        _ => None,
    }
}

#[derive(Default)]
struct Shunter {
    output_queue: Vec<ShuntEntity>,
    operator_stack: Vec<Token>,
    arity_stack: Vec<usize>,
    last_parsed: Option<TokenType>,
    diagnostics: Vec<Diagnostic>,
}

impl Shunter {
    fn output(&mut self, token: Token) {
        trace!("output {}", token);
        self.output_queue.push(ShuntEntity::Token(token));
    }

    /// Pops operators into the output until a boundary kind is on top.
    /// Running into any other opener means it was never closed.
    fn flush(&mut self, boundaries: &[TokenType]) -> Result<(), SyntaxError> {
        while let Some(top) = self.operator_stack.last() {
            if boundaries.contains(&top.ttype) {
                break;
            }
            if let Some(closer) = closer_for(top.ttype) {
                return Err(SyntaxError::expected_closer(closer, Some(top.offset)));
            }
            if let Some(top) = self.operator_stack.pop() {
                self.output(top);
            }
        }
        Ok(())
    }

    /// Pops operators into the output until `opener` comes off the stack,
    /// discarding it.
    fn close(&mut self, opener: TokenType, closing: &Token) -> Result<(), SyntaxError> {
        self.flush(&[opener])?;
        match self.operator_stack.pop() {
            Some(top) if top.ttype == opener => Ok(()),
            _ => {
                let open = match opener {
                    TokenType::ParenOpen => "(",
                    TokenType::LambdaStart => "{",
                    _ => "[",
                };
                Err(SyntaxError::new(
                    format!("Expected an opening `{}` before `{}`", open, closing.value),
                    Some(closing.offset),
                ))
            }
        }
    }

    fn push_operator(&mut self, token: Token) {
        if let Some((prec, _)) = precedence(&token) {
            while let Some(top) = self.operator_stack.last() {
                let Some((top_prec, top_assoc)) = precedence(top) else {
                    break;
                };
                if top_prec < prec || (top_prec == prec && top_assoc == Associativity::Right) {
                    break;
                }
                if let Some(top) = self.operator_stack.pop() {
                    self.output(top);
                }
            }
        }
        self.operator_stack.push(token);
    }

    fn close_bracket(
        &mut self,
        token: &Token,
        opener: TokenType,
        kind: ArityKind,
    ) -> Result<(), SyntaxError> {
        if self.last_parsed == Some(TokenType::Comma) {
            return Err(SyntaxError::new(
                format!("Expected an element between `,` and `{}`", token.value),
                Some(token.offset),
            ));
        }
        let mut count = self.arity_stack.pop().unwrap_or(0);
        if self.last_parsed == Some(opener) {
            count = 0;
        }
        self.close(opener, token)?;
        trace!("output {} marker with {} elements", kind, count);
        self.output_queue.push(ShuntEntity::Arity { kind, count });
        Ok(())
    }

    fn step(&mut self, token: Token) -> Result<(), SyntaxError> {
        let ttype = token.ttype;
        match ttype {
            TokenType::Number | TokenType::String | TokenType::Word | TokenType::Abstract => {
                self.output(token);
            }
            TokenType::Separator => {
                self.flush(&[TokenType::LambdaStart])?;
            }
            TokenType::Operator => {
                self.push_operator(token);
            }
            TokenType::UnaryOperator => {
                self.operator_stack.push(token);
            }
            TokenType::BracketOpen | TokenType::ArrayStart => {
                self.operator_stack.push(token);
                self.arity_stack.push(1);
            }
            TokenType::Comma => {
                if matches!(
                    self.last_parsed,
                    Some(TokenType::Comma | TokenType::BracketOpen | TokenType::ArrayStart)
                ) {
                    return Err(SyntaxError::new(
                        "Expected an element before `,`",
                        Some(token.offset),
                    ));
                }
                match self.arity_stack.last_mut() {
                    Some(count) => *count += 1,
                    None => {
                        return Err(SyntaxError::new(
                            "Unexpected `,` outside of a call or array",
                            Some(token.offset),
                        ))
                    }
                }
                self.flush(&[TokenType::LambdaStart, TokenType::ArrayStart, TokenType::BracketOpen])?;
            }
            TokenType::BracketClose => {
                self.close_bracket(&token, TokenType::BracketOpen, ArityKind::CallFunc)?;
            }
            TokenType::ArrayEnd => {
                self.close_bracket(&token, TokenType::ArrayStart, ArityKind::GatherArray)?;
            }
            TokenType::ParenOpen => {
                self.operator_stack.push(token);
            }
            TokenType::ParenClose => {
                self.close(TokenType::ParenOpen, &token)?;
            }
            TokenType::LambdaStart => {
                self.output(token.clone());
                self.operator_stack.push(token);
            }
            TokenType::LambdaEnd => {
                self.close(TokenType::LambdaStart, &token)?;
                self.output(token);
            }
            TokenType::Whitespace => {}
            TokenType::Other => {
                let diagnostic = Diagnostic::new(
                    Stage::Shunt,
                    format!("Unhandled token type {} ({:?})", token.ttype, token.value),
                    Some(token.offset),
                );
                warn!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
            }
        }

        if ttype.is_significant() {
            self.last_parsed = Some(ttype);
        }
        Ok(())
    }
}

/// Reorders tokens into postfix output, inserting arity markers for calls
/// and array literals.
pub fn shunt(tokens: Vec<Token>) -> Result<Shunted, SyntaxError> {
    let mut shunter = Shunter::default();
    for token in tokens {
        shunter.step(token)?;
    }
    shunter.flush(&[])?;

    debug!("shunted into {} entities", shunter.output_queue.len());
    Ok(Shunted {
        entities: shunter.output_queue,
        diagnostics: shunter.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use crate::minlang::lexer::lex;

    use super::*;

    fn shunt_code(code: &str) -> Result<Shunted, SyntaxError> {
        shunt(lex(code))
    }

    fn order(code: &str) -> Vec<String> {
        shunt_code(code)
            .expect("Unable to shunt code.")
            .entities
            .iter()
            .map(|entity| match entity {
                ShuntEntity::Token(token) => token.value.clone(),
                ShuntEntity::Arity { kind: ArityKind::CallFunc, count } => format!("call:{count}"),
                ShuntEntity::Arity { kind: ArityKind::GatherArray, count } => format!("array:{count}"),
            })
            .collect()
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(order("1+2*3"), ["1", "2", "3", "*", "+"]);
        assert_eq!(order("1*2+3"), ["1", "2", "*", "3", "+"]);
    }

    #[test]
    fn left_associative_ties_pop() {
        assert_eq!(order("1-2-3"), ["1", "2", "-", "3", "-"]);
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(order("2^3^4"), ["2", "3", "4", "^", "^"]);
    }

    #[test]
    fn parens_group() {
        assert_eq!(order("(1+2)*3"), ["1", "2", "+", "3", "*"]);
    }

    #[test]
    fn unary_binds_before_binary() {
        assert_eq!(order("-2+3"), ["2", "-", "3", "+"]);
        assert_eq!(order("1 - -2 * 3"), ["1", "2", "-", "3", "*", "-"]);
    }

    #[test]
    fn call_arity() {
        assert_eq!(order("f[]"), ["f", "call:0"]);
        assert_eq!(order("f[ ]"), ["f", "call:0"]);
        assert_eq!(order("f[1,2,3]"), ["f", "1", "2", "3", "call:3"]);
        assert_eq!(order("f[1+2, g[x]]"), ["f", "1", "2", "+", "g", "x", "call:1", "call:2"]);
    }

    #[test]
    fn array_arity() {
        assert_eq!(order("[]"), ["array:0"]);
        assert_eq!(order("[1, 2]"), ["1", "2", "array:2"]);
        assert_eq!(order("[[1], 2]"), ["1", "array:1", "2", "array:2"]);
    }

    #[test]
    fn lambdas_stay_in_output() {
        assert_eq!(order("{1;2}"), ["{", "1", "2", "}"]);
        assert_eq!(order("x := {_1 + 1}"), ["x", "{", "_1", "1", "+", "}", ":="]);
    }

    #[test]
    fn separators_flush_statements() {
        assert_eq!(order("x := 1; y := 2"), ["x", "1", ":=", "y", "2", ":="]);
    }

    #[test]
    fn unclosed_paren_fails() {
        let err = shunt_code("(1+2").unwrap_err();
        assert_eq!(err, SyntaxError::expected_closer(")", Some(0)));
    }

    #[test]
    fn stray_closers_fail() {
        assert!(shunt_code("1+2)").is_err());
        assert!(shunt_code("1]").is_err());
        assert!(shunt_code("}").is_err());
        assert!(shunt_code("f[1").is_err());
        assert!(shunt_code("{1").is_err());
    }

    #[test]
    fn crossed_brackets_fail() {
        let err = shunt_code("[(1]").unwrap_err();
        assert_eq!(err, SyntaxError::expected_closer(")", Some(1)));
    }

    #[test]
    fn comma_outside_brackets_fails() {
        let err = shunt_code("1, 2").unwrap_err();
        assert_eq!(err.offset, Some(1));
    }

    #[test]
    fn empty_elements_fail() {
        let err = shunt_code("f[1,]").unwrap_err();
        assert_eq!(err, SyntaxError::new("Expected an element between `,` and `]`", Some(4)));
        let err = shunt_code("[1,]").unwrap_err();
        assert_eq!(err.offset, Some(3));
        let err = shunt_code("f[,1]").unwrap_err();
        assert_eq!(err, SyntaxError::new("Expected an element before `,`", Some(2)));
        let err = shunt_code("f[1,,2]").unwrap_err();
        assert_eq!(err.offset, Some(4));
        assert!(shunt_code("f[1, ]").is_err());
    }

    #[test]
    fn unknown_tokens_are_reported() {
        let shunted = shunt_code("1 @").expect("Unable to shunt code.");
        assert_eq!(shunted.entities.len(), 1);
        assert_eq!(shunted.diagnostics.len(), 1);
        assert_eq!(shunted.diagnostics[0].offset, Some(2));
    }

    #[test]
    fn entity_display() {
        let shunted = shunt_code("f[]").expect("Unable to shunt code.");
        assert_eq!(shunted.entities[0].to_string(), "MSE(Token(word, \"f\", 0))");
        assert_eq!(shunted.entities[1].to_string(), "MSE(call_func, 0)");
    }
}
