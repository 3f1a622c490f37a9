use core::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    // Data
    Number,
    String,
    Word,
    Abstract,

    Operator,
    UnaryOperator,

    // Insignificant
    Whitespace,
    Separator,

    // Call brackets and array literals share `[` `]`
    BracketOpen,
    ArrayStart,
    BracketClose,
    ArrayEnd,

    ParenOpen,
    ParenClose,
    Comma,
    LambdaStart,
    LambdaEnd,
    Other,
}

impl TokenType {
    pub fn is_data(self) -> bool {
        matches!(self, Self::Number | Self::String | Self::Word | Self::Abstract)
    }

    /// Kinds that can end a data expression. Decides unary vs binary
    /// operators and call brackets vs array literals.
    pub fn is_data_signifier(self) -> bool {
        self.is_data()
            || matches!(
                self,
                Self::BracketClose | Self::ParenClose | Self::ArrayEnd | Self::LambdaEnd
            )
    }

    pub fn is_operator(self) -> bool {
        matches!(self, Self::Operator | Self::UnaryOperator)
    }

    pub fn is_significant(self) -> bool {
        !matches!(self, Self::Whitespace | Self::Separator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Word => "word",
            Self::Abstract => "abstract",
            Self::Operator => "operator",
            Self::UnaryOperator => "unary_operator",
            Self::Whitespace => "whitespace",
            Self::Separator => "separator",
            Self::BracketOpen => "bracket_open",
            Self::ArrayStart => "array_start",
            Self::BracketClose => "bracket_close",
            Self::ArrayEnd => "array_end",
            Self::ParenOpen => "paren_open",
            Self::ParenClose => "paren_close",
            Self::Comma => "comma",
            Self::LambdaStart => "lambda_start",
            Self::LambdaEnd => "lambda_end",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Associativity {
    Left,
    Right,
}

/// Binary operators in matching priority order. The lexer takes the first
/// entry that prefixes the input, not the longest.
pub const PRECEDENCE: [(&str, u32, Associativity); 9] = [
    (":=", 5, Associativity::Left),
    (".=", 5, Associativity::Left),
    ("=", 20, Associativity::Left),
    ("=>", 30, Associativity::Left),
    ("+", 50, Associativity::Left),
    ("-", 50, Associativity::Left),
    ("*", 60, Associativity::Left),
    ("/", 60, Associativity::Left),
    ("^", 80, Associativity::Right),
];

/// Prefix operators outrank every binary operator.
pub const UNARY_PRECEDENCE: u32 = u32::MAX;

/// Precedence and associativity of an operator token, `None` for anything
/// that does not take part in precedence resolution (brackets, parens...).
pub fn precedence(token: &Token) -> Option<(u32, Associativity)> {
    let (_, prec, assoc) = PRECEDENCE.iter().find(|(raw, _, _)| *raw == token.value)?;
    match token.ttype {
        TokenType::Operator => Some((*prec, *assoc)),
        TokenType::UnaryOperator => Some((UNARY_PRECEDENCE, *assoc)),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// 1-based line and column of a byte offset into `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut location = Location { line: 1, column: 1 };
        for (i, c) in source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                location.line += 1;
                location.column = 1;
            } else {
                location.column += 1;
            }
        }
        location
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    pub ttype: TokenType,
    pub value: String,
    /// Byte offset of the first character in the source text.
    pub offset: usize,
}

impl Token {
    pub fn new(ttype_: TokenType, value_: &str, offset_: usize) -> Self {
        Self {
            ttype: ttype_,
            value: value_.to_string(),
            offset: offset_,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({}, {:?}, {})", self.ttype, self.value, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_outranks_binary() {
        let unary = Token::new(TokenType::UnaryOperator, "-", 0);
        let binary = Token::new(TokenType::Operator, "^", 0);
        assert_eq!(precedence(&unary), Some((UNARY_PRECEDENCE, Associativity::Left)));
        assert_eq!(precedence(&binary), Some((80, Associativity::Right)));
        assert!(precedence(&unary).unwrap().0 > precedence(&binary).unwrap().0);
    }

    #[test]
    fn brackets_have_no_precedence() {
        assert_eq!(precedence(&Token::new(TokenType::ParenOpen, "(", 0)), None);
        assert_eq!(precedence(&Token::new(TokenType::BracketOpen, "[", 0)), None);
    }

    #[test]
    fn location_counts_lines() {
        let code = "x := 1\ny := 2";
        assert_eq!(Location::from_offset(code, 0), Location { line: 1, column: 1 });
        assert_eq!(Location::from_offset(code, 7), Location { line: 2, column: 1 });
        assert_eq!(Location::from_offset(code, 12), Location { line: 2, column: 6 });
    }

    #[test]
    fn token_display() {
        let token = Token::new(TokenType::String, "\"hi\"", 3);
        assert_eq!(token.to_string(), "Token(string, \"\\\"hi\\\"\", 3)");
    }
}
