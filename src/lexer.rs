//! Lexical Analyzer for the Rill Scripting Language
//!
//! This module implements the tokenization phase of the Rill pipeline. It
//! converts raw source text into a stream of tokens that the parser pulls
//! one at a time.
//!
//! ## Tokenization Process
//!
//! The lexer performs several key functions:
//! 1. **Character Processing**: Iterates through source code character by character
//! 2. **Token Recognition**: Identifies keywords, operators, literals, and identifiers
//! 3. **Comment Filtering**: Strips single-line comments (`//`) from the token stream
//! 4. **Position Tracking**: Maintains the 1-based source line of every token
//!
//! ## Supported Tokens
//!
//! - **Literals**: Numbers (`42`, `3.14`), Strings (`"hello"`)
//! - **Identifiers**: `my_var`, `counter`, `_tmp`
//! - **Keywords**: `class fn let virtual override print if else while`
//! - **Operators**: `+ - * /`, comparators `= == ! != < <= > >=`
//! - **Punctuation**: `( ) { } , . ;`
//! - **Sentinels**: end-of-input, unknown
//!
//! ## Error Semantics
//!
//! The lexer never fails. Characters that match no token become `Unknown`
//! tokens, as does a string literal left open at end-of-input; the parser is
//! responsible for reporting on them when it encounters them. This keeps the
//! scanner total: every input eventually yields `Eof`.

use std::fmt;

/// The lexical categories of the Rill language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals and names
    Identifier,
    Number,
    String,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Semicolon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,

    // Comparators
    Equal,
    EqualEqual,
    Bang,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Keywords
    Class,
    Fn,
    Let,
    Virtual,
    Override,
    Print,
    If,
    Else,
    While,

    // Sentinels
    Eof,
    Unknown,
}

/// A single lexical unit: its category, exact source slice, and 1-based
/// source line. For string literals the lexeme excludes the surrounding
/// quotes. Tokens are immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }
}

impl fmt::Display for Token {
    /// Renders the token the way parser diagnostics refer to it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::String => write!(f, "\"{}\"", self.lexeme),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

/// Pull-style scanner over the source text.
///
/// State is the character vector, the current index, and the current line.
/// `next_token` produces tokens on demand in source order; once the input is
/// exhausted it keeps returning the end-of-input sentinel.
pub struct Lexer {
    /// Source code as a vector of characters for efficient indexing
    input: Vec<char>,
    /// Current position in the character stream
    position: usize,
    /// Current line number (1-based)
    line: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
        }
    }

    /// Scans and returns the next token from the input stream.
    ///
    /// Skips whitespace and `//` comments first, then dispatches on the next
    /// character. Multi-character comparators (`==`, `!=`, `<=`, `>=`) are
    /// formed with one character of lookahead; `=`, `!`, `<`, `>` alone are
    /// the one-character variants.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        if self.is_at_end() {
            return Token::new(TokenKind::Eof, "", self.line);
        }

        let line = self.line;
        let c = self.advance();

        match c {
            '(' => Token::new(TokenKind::LeftParen, "(", line),
            ')' => Token::new(TokenKind::RightParen, ")", line),
            '{' => Token::new(TokenKind::LeftBrace, "{", line),
            '}' => Token::new(TokenKind::RightBrace, "}", line),
            ',' => Token::new(TokenKind::Comma, ",", line),
            '.' => Token::new(TokenKind::Dot, ".", line),
            ';' => Token::new(TokenKind::Semicolon, ";", line),
            '+' => Token::new(TokenKind::Plus, "+", line),
            '-' => Token::new(TokenKind::Minus, "-", line),
            '*' => Token::new(TokenKind::Star, "*", line),
            '/' => Token::new(TokenKind::Slash, "/", line),
            '=' => {
                if self.peek() == '=' {
                    self.advance();
                    Token::new(TokenKind::EqualEqual, "==", line)
                } else {
                    Token::new(TokenKind::Equal, "=", line)
                }
            }
            '!' => {
                if self.peek() == '=' {
                    self.advance();
                    Token::new(TokenKind::BangEqual, "!=", line)
                } else {
                    Token::new(TokenKind::Bang, "!", line)
                }
            }
            '<' => {
                if self.peek() == '=' {
                    self.advance();
                    Token::new(TokenKind::LessEqual, "<=", line)
                } else {
                    Token::new(TokenKind::Less, "<", line)
                }
            }
            '>' => {
                if self.peek() == '=' {
                    self.advance();
                    Token::new(TokenKind::GreaterEqual, ">=", line)
                } else {
                    Token::new(TokenKind::Greater, ">", line)
                }
            }
            '"' => self.string_literal(line),
            c if c.is_ascii_digit() => self.number_literal(c, line),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(c, line),
            c => Token::new(TokenKind::Unknown, c.to_string(), line),
        }
    }

    /// Scans a string literal; the opening quote has been consumed.
    ///
    /// The emitted lexeme is the interior only. Newlines inside the literal
    /// advance the line counter; the token is attributed to the line where it
    /// started. An unterminated literal becomes an `Unknown` token carrying
    /// whatever interior was consumed.
    fn string_literal(&mut self, line: usize) -> Token {
        let mut value = String::new();

        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            value.push(self.advance());
        }

        if self.is_at_end() {
            return Token::new(TokenKind::Unknown, value, line);
        }

        self.advance(); // closing quote
        Token::new(TokenKind::String, value, line)
    }

    /// Scans a numeric literal starting with the given digit.
    ///
    /// Consumes the integer part, then a fractional part only when a `.` is
    /// directly followed by a digit (two characters of lookahead), so `1.`
    /// lexes as the number `1` followed by a `.` token.
    fn number_literal(&mut self, first_digit: char, line: usize) -> Token {
        let mut value = String::from(first_digit);

        while self.peek().is_ascii_digit() {
            value.push(self.advance());
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            value.push(self.advance()); // consume '.'
            while self.peek().is_ascii_digit() {
                value.push(self.advance());
            }
        }

        Token::new(TokenKind::Number, value, line)
    }

    /// Scans an identifier or keyword starting with the given character.
    fn identifier_or_keyword(&mut self, first_char: char, line: usize) -> Token {
        let mut value = String::from(first_char);

        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            value.push(self.advance());
        }

        // Keyword table
        let kind = match value.as_str() {
            "class" => TokenKind::Class,
            "fn" => TokenKind::Fn,
            "let" => TokenKind::Let,
            "virtual" => TokenKind::Virtual,
            "override" => TokenKind::Override,
            "print" => TokenKind::Print,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier,
        };

        Token::new(kind, value, line)
    }

    /// Skips whitespace, newlines (counting them), and `//` comments.
    ///
    /// A comment runs up to, not including, the following newline so the
    /// line counter stays accurate. `\r` without `\n` is plain whitespace.
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.line += 1;
                    self.advance();
                }
                '/' if self.peek_next() == '/' => {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes and returns the current character.
    fn advance(&mut self) -> char {
        if !self.is_at_end() {
            let c = self.input[self.position];
            self.position += 1;
            c
        } else {
            '\0'
        }
    }

    /// Returns the current character without consuming it.
    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    /// Returns the character after the current position without consuming it.
    fn peek_next(&self) -> char {
        if self.position + 1 >= self.input.len() {
            '\0'
        } else {
            self.input[self.position + 1]
        }
    }

    /// Drains the scanner into a vector ending with the `Eof` token.
    #[cfg(test)]
    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_punctuation_and_operators() {
        assert_eq!(
            kinds("( ) { } , . ; + - * /"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Semicolon,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_comparators_with_lookahead() {
        assert_eq!(
            kinds("= == ! != < <= > >="),
            vec![
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(
            kinds("class fn let virtual override print if else while classy"),
            vec![
                TokenKind::Class,
                TokenKind::Fn,
                TokenKind::Let,
                TokenKind::Virtual,
                TokenKind::Override,
                TokenKind::Print,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        let tokens = Lexer::new("42 3.14").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].lexeme, "3.14");
    }

    #[test]
    fn dot_without_following_digit_is_not_fractional() {
        let tokens = Lexer::new("1.foo").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn string_lexeme_excludes_quotes() {
        let tokens = Lexer::new("\"hello\"").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "hello");
    }

    #[test]
    fn multiline_string_counts_lines() {
        let tokens = Lexer::new("\"a\nb\" x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].line, 1);
        // The identifier after the literal sits on line 2.
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_is_unknown() {
        let tokens = Lexer::new("\"oops").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[0].lexeme, "oops");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn unmatched_character_is_unknown() {
        let tokens = Lexer::new("let @ x").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].lexeme, "@");
    }

    #[test]
    fn comments_are_skipped_to_end_of_line() {
        assert_eq!(
            kinds("let x // the answer\n= 42;"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_lines_across_newlines() {
        let tokens = Lexer::new("let a;\r\nlet b;\nlet c;").tokenize();
        let lines: Vec<usize> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Let)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn eof_is_stable() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
