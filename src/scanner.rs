use std::{fmt, str::Chars};

use thiserror::Error;

pub(crate) const EOF_CHAR: char = '\0';

/// Byte offsets of a token (or error) in the source, `start..end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("Unexpected character '{character}'")]
    UnexpectedCharacter { character: char, span: Span },
    #[error("Unterminated string")]
    UnterminatedString { span: Span },
}

impl ScanError {
    pub fn span(&self) -> Span {
        match self {
            ScanError::UnexpectedCharacter { span, .. }
            | ScanError::UnterminatedString { span } => *span,
        }
    }
}

pub struct Scanner<'a> {
    source: &'a str,
    chars: Chars<'a>,
    start: usize,
    offset: usize,
    emitted_eof: bool,
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, ScanError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.scan_token()
    }
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            start: 0,
            offset: 0,
            emitted_eof: false,
        }
    }

    /// Scans the whole source, collecting every error instead of stopping at
    /// the first one. The token list always ends with `Eof`.
    pub fn scan_tokens(self) -> (Vec<Token>, Vec<ScanError>) {
        let mut tokens = vec![];
        let mut errors = vec![];
        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => errors.push(error),
            }
        }
        (tokens, errors)
    }

    fn scan_token(&mut self) -> Option<Result<Token, ScanError>> {
        self.skip_trivia();
        self.start = self.offset;

        let Some(c) = self.advance() else {
            if self.emitted_eof {
                return None;
            }
            self.emitted_eof = true;
            return Some(Ok(self.create_token(TokenKind::Eof)));
        };

        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '"' => return Some(self.string()),
            '0'..='9' => return Some(Ok(self.number())),
            c if is_identifier_start(c) => return Some(Ok(self.identifier())),
            character => {
                return Some(Err(ScanError::UnexpectedCharacter {
                    character,
                    span: self.span(),
                }))
            }
        };

        Some(Ok(self.create_token(kind)))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_first() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_second() == '/' => self.advance_until('\n'),
                _ => return,
            }
        }
    }

    fn either(&mut self, expected: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if !self.is_at_end() && self.peek_first() == expected {
            self.advance();
            matched
        } else {
            otherwise
        }
    }

    fn create_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            lexem: self.source[self.start..self.offset].to_string(),
            literal: None,
            span: self.span(),
        }
    }

    fn span(&self) -> Span {
        Span::new(self.start, self.offset)
    }

    fn string(&mut self) -> Result<Token, ScanError> {
        while !self.is_at_end() && self.peek_first() != '"' {
            self.advance();
        }

        if self.is_at_end() {
            return Err(ScanError::UnterminatedString { span: self.span() });
        }

        // closing quote
        self.advance();

        let value = self.source[self.start + 1..self.offset - 1].to_string();
        let mut token = self.create_token(TokenKind::String);
        token.literal = Some(Literal::String(value));
        Ok(token)
    }

    fn number(&mut self) -> Token {
        while self.peek_first().is_ascii_digit() {
            self.advance();
        }

        if self.peek_first() == '.' && self.peek_second().is_ascii_digit() {
            self.advance();
            while self.peek_first().is_ascii_digit() {
                self.advance();
            }
        }

        let mut token = self.create_token(TokenKind::Number);
        // digits with at most one interior '.' always parse
        let value = token.lexem.parse().unwrap_or_default();
        token.literal = Some(Literal::Number(value));
        token
    }

    fn identifier(&mut self) -> Token {
        while is_identifier_continue(self.peek_first()) {
            self.advance();
        }

        let mut token = self.create_token(TokenKind::Identifier);
        if let Some(kind) = keyword(&token.lexem) {
            token.kind = kind;
            token.literal = match kind {
                TokenKind::True => Some(Literal::Boolean(true)),
                TokenKind::False => Some(Literal::Boolean(false)),
                _ => None,
            };
        }
        token
    }

    fn advance_until(&mut self, predicate_char: char) {
        while !self.is_at_end() && self.peek_first() != predicate_char {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    fn peek_first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    fn peek_second(&self) -> char {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().unwrap_or(EOF_CHAR)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        Some(c)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "and" => TokenKind::And,
        "class" => TokenKind::Class,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "fun" => TokenKind::Fun,
        "for" => TokenKind::For,
        "if" => TokenKind::If,
        "nil" => TokenKind::Nil,
        "or" => TokenKind::Or,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "super" => TokenKind::Super,
        "this" => TokenKind::This,
        "true" => TokenKind::True,
        "var" => TokenKind::Var,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexem: String,
    pub literal: Option<Literal>,
    pub span: Span,
}

impl Token {
    /// A token that does not come from any source text. Used for desugared
    /// nodes and in tests.
    pub fn synthetic(kind: TokenKind, lexem: &str) -> Self {
        Token {
            kind,
            lexem: lexem.to_string(),
            literal: None,
            span: Span::default(),
        }
    }
}

/// Decoded value of a literal token.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Minus => "'-'",
            TokenKind::Plus => "'+'",
            TokenKind::Semicolon => "';'",
            TokenKind::Slash => "'/'",
            TokenKind::Star => "'*'",
            TokenKind::Bang => "'!'",
            TokenKind::BangEqual => "'!='",
            TokenKind::Equal => "'='",
            TokenKind::EqualEqual => "'=='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::And => "'and'",
            TokenKind::Class => "'class'",
            TokenKind::Else => "'else'",
            TokenKind::False => "'false'",
            TokenKind::Fun => "'fun'",
            TokenKind::For => "'for'",
            TokenKind::If => "'if'",
            TokenKind::Nil => "'nil'",
            TokenKind::Or => "'or'",
            TokenKind::Print => "'print'",
            TokenKind::Return => "'return'",
            TokenKind::Super => "'super'",
            TokenKind::This => "'this'",
            TokenKind::True => "'true'",
            TokenKind::Var => "'var'",
            TokenKind::While => "'while'",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ignores_comments() {
        let source = "// dasdassasadsad
        2 + 2";

        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn scans_one_and_two_character_operators() {
        assert_eq!(
            kinds("! != = == < <= > >= / *"),
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert_eq!(
            kinds("class classy this super_"),
            vec![
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::This,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn decodes_number_literals() {
        let (tokens, _) = Scanner::new("12 3.5 7.").scan_tokens();
        let literals: Vec<_> = tokens.iter().map(|t| t.literal.clone()).collect();
        assert_eq!(
            literals,
            vec![
                Some(Literal::Number(12.0)),
                Some(Literal::Number(3.5)),
                Some(Literal::Number(7.0)),
                None, // trailing '.' is its own token
                None,
            ]
        );
    }

    #[test]
    fn strings_keep_raw_text_and_span() {
        let (tokens, errors) = Scanner::new("  \"a\nb\" ").scan_tokens();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].literal, Some(Literal::String("a\nb".into())));
        assert_eq!(tokens[0].span, Span::new(2, 7));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn collects_errors_and_keeps_scanning() {
        let (tokens, errors) = Scanner::new("1 # 2 \"open").scan_tokens();
        assert_eq!(
            errors,
            vec![
                ScanError::UnexpectedCharacter {
                    character: '#',
                    span: Span::new(2, 3)
                },
                ScanError::UnterminatedString {
                    span: Span::new(6, 11)
                },
            ]
        );
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn booleans_carry_their_value() {
        let (tokens, _) = Scanner::new("true false").scan_tokens();
        assert_eq!(tokens[0].literal, Some(Literal::Boolean(true)));
        assert_eq!(tokens[1].literal, Some(Literal::Boolean(false)));
    }
}
