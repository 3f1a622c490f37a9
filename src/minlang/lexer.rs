use tracing::{debug, trace};

use super::token::{Token, TokenType, PRECEDENCE};

/// Recognisers are tried in this order and the first match wins.
const TOKEN_ORDER: [TokenType; 18] = [
    TokenType::Operator,
    TokenType::UnaryOperator,
    TokenType::Whitespace,
    TokenType::Number,
    TokenType::String,
    TokenType::Word,
    TokenType::Abstract,

    TokenType::Separator,

    TokenType::BracketOpen,
    TokenType::ArrayStart,
    TokenType::BracketClose,
    TokenType::ArrayEnd,

    TokenType::ParenOpen,
    TokenType::ParenClose,
    TokenType::Comma,
    TokenType::LambdaStart,
    TokenType::LambdaEnd,
    TokenType::Other,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BracketType {
    Call,
    Array,
}

struct Lexer<'a> {
    code: &'a str,
    ptr: usize,
    tokens: Vec<Token>,
    last_significant: Option<TokenType>,
    /// What each open `[` turned out to be, so its `]` closes the same way.
    bracket_types: Vec<BracketType>,
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte length of the longest prefix of `text` whose chars satisfy `pred`.
fn span_while(text: &str, pred: impl Fn(char) -> bool) -> usize {
    text.char_indices()
        .find(|(_, c)| !pred(*c))
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

impl<'a> Lexer<'a> {
    fn new(code: &'a str) -> Self {
        Self {
            code,
            ptr: 0,
            tokens: vec![],
            last_significant: None,
            bracket_types: vec![],
        }
    }

    fn rest(&self) -> &'a str {
        &self.code[self.ptr..]
    }

    fn cur(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn follows_data(&self) -> bool {
        self.last_significant
            .is_some_and(TokenType::is_data_signifier)
    }

    fn single(&self, c: char) -> Option<usize> {
        (self.cur() == Some(c)).then_some(1)
    }

    fn read_operator(&self) -> Option<usize> {
        let rest = self.rest();
        PRECEDENCE.iter()
            .find(|(raw, _, _)| rest.starts_with(raw))
            .map(|(raw, _, _)| raw.len())
    }

    fn read_number(&self) -> Option<usize> {
        let rest = self.rest();
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        Some(span_while(rest, |c| c.is_ascii_digit() || c == '.'))
    }

    fn read_string(&self) -> Option<usize> {
        let rest = self.rest();
        if !rest.starts_with('"') {
            return None;
        }
        let mut chars = rest.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => return Some(i + 1),
                _ => {}
            }
        }
        // Unterminated, runs to the end of input.
        Some(rest.len())
    }

    fn read_word(&self) -> Option<usize> {
        let rest = self.rest();
        if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(span_while(rest, is_word_char))
    }

    fn read_abstract(&self) -> Option<usize> {
        let rest = self.rest();
        if !rest.starts_with('_') {
            return None;
        }
        let underscores = span_while(rest, |c| c == '_');
        Some(underscores + span_while(&rest[underscores..], |c| c.is_ascii_digit()))
    }

    fn read(&mut self, ttype: TokenType) -> Option<usize> {
        match ttype {
            TokenType::Operator => {
                if !self.follows_data() {
                    return None;
                }
                self.read_operator()
            }
            TokenType::UnaryOperator => self.read_operator(),
            TokenType::Whitespace => {
                let len = span_while(self.rest(), is_space);
                (len > 0).then_some(len)
            }
            TokenType::Number => self.read_number(),
            TokenType::String => self.read_string(),
            TokenType::Word => self.read_word(),
            TokenType::Abstract => self.read_abstract(),
            TokenType::Separator => self.single(';'),
            TokenType::BracketOpen => {
                if self.cur() != Some('[') || !self.follows_data() {
                    return None;
                }
                self.bracket_types.push(BracketType::Call);
                Some(1)
            }
            TokenType::ArrayStart => {
                self.single('[')?;
                self.bracket_types.push(BracketType::Array);
                Some(1)
            }
            TokenType::BracketClose => {
                if self.cur() != Some(']') || self.bracket_types.last() != Some(&BracketType::Call) {
                    return None;
                }
                self.bracket_types.pop();
                Some(1)
            }
            TokenType::ArrayEnd => {
                self.single(']')?;
                self.bracket_types.pop();
                Some(1)
            }
            TokenType::ParenOpen => self.single('('),
            TokenType::ParenClose => self.single(')'),
            TokenType::Comma => self.single(','),
            TokenType::LambdaStart => self.single('{'),
            TokenType::LambdaEnd => self.single('}'),
            TokenType::Other => self.cur().map(char::len_utf8),
        }
    }

    fn step(&mut self) {
        let start = self.ptr;
        for ttype in TOKEN_ORDER {
            if let Some(len) = self.read(ttype) {
                let token = Token::new(ttype, &self.code[start..start + len], start);
                trace!("lexed {}", token);
                if ttype.is_significant() {
                    self.last_significant = Some(ttype);
                }
                self.tokens.push(token);
                self.ptr += len;
                return;
            }
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.ptr < self.code.len() {
            self.step();
        }
        self.tokens
    }
}

/// Splits source text into tokens. Never fails: anything unrecognised
/// becomes a one-character `other` token.
pub fn lex(code: &str) -> Vec<Token> {
    let tokens = Lexer::new(code).run();
    debug!("tokenized {} bytes into {} tokens", code.len(), tokens.len());
    tokens
}
