//! Single-pass tokenizer for the JS-literal grammar
//!
//! Every token keeps its byte span so the parser can slice out the exact
//! source text of function expressions.

use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use crate::error::RevalueError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    /// Identifiers and keywords; the parser tells them apart
    Ident(String),
    Punct(Punct),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Question,
    Nullish,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Tokenize `source`; the result always ends with an `Eof` token
pub fn tokenize(source: &str) -> Result<Vec<Token>, RevalueError> {
    Lexer {
        source,
        chars: source.char_indices().peekable(),
    }
    .run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, RevalueError> {
        let mut tokens = Vec::new();

        while let Some(&(start, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }

            let kind = match ch {
                '/' if self.peek_second() == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_second() == Some('*') => {
                    self.skip_block_comment(start)?;
                    continue;
                }
                '"' | '\'' => self.string(start, ch)?,
                '0'..='9' => self.number(start)?,
                '.' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                    self.number(start)?
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => self.ident(start),
                _ => TokenKind::Punct(self.punct(start, ch)?),
            };

            let end = self.position();
            tokens.push(Token {
                kind,
                span: start..end,
            });
        }

        let end = self.source.len();
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: end..end,
        });
        Ok(tokens)
    }

    fn position(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().map(|(_, c)| *c) == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn skip_line_comment(&mut self) {
        for (_, ch) in self.chars.by_ref() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self, start: usize) -> Result<(), RevalueError> {
        self.chars.next(); // '/'
        self.chars.next(); // '*'
        while let Some((_, ch)) = self.chars.next() {
            if ch == '*' && self.eat('/') {
                return Ok(());
            }
        }
        Err(RevalueError::Lex {
            position: start,
            details: "unterminated comment".to_string(),
        })
    }

    fn ident(&mut self, start: usize) -> TokenKind {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.chars.next();
            } else {
                break;
            }
        }
        let end = self.position();
        TokenKind::Ident(self.source[start..end].to_string())
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, RevalueError> {
        let first = self.chars.next().map(|(_, c)| c);

        // Hex literal: 0x1F
        if first == Some('0') && matches!(self.chars.peek(), Some((_, 'x' | 'X'))) {
            self.chars.next();
            let digits_start = self.position();
            while self.chars.peek().is_some_and(|(_, c)| c.is_ascii_hexdigit()) {
                self.chars.next();
            }
            let digits = &self.source[digits_start..self.position()];
            return u64::from_str_radix(digits, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| RevalueError::Lex {
                    position: start,
                    details: "invalid hex literal".to_string(),
                });
        }

        let mut seen_dot = first == Some('.');
        let mut seen_exp = false;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '0'..='9' => {
                    self.chars.next();
                }
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.chars.next();
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    self.chars.next();
                    if matches!(self.chars.peek(), Some((_, '+' | '-'))) {
                        self.chars.next();
                    }
                }
                _ => break,
            }
        }

        let end = self.position();
        let text = &self.source[start..end];
        if self.chars.peek().is_some_and(|(_, c)| c.is_alphabetic() || *c == '_') {
            return Err(RevalueError::Lex {
                position: end,
                details: format!("identifier starts immediately after number '{}'", text),
            });
        }
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| RevalueError::Lex {
                position: start,
                details: format!("invalid number '{}'", text),
            })
    }

    fn string(&mut self, start: usize, quote: char) -> Result<TokenKind, RevalueError> {
        self.chars.next(); // opening quote
        let mut out = String::new();

        while let Some((i, ch)) = self.chars.next() {
            match ch {
                c if c == quote => return Ok(TokenKind::Str(out)),
                '\n' => break,
                '\\' => {
                    let Some((_, escaped)) = self.chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'v' => out.push('\u{b}'),
                        '0' => out.push('\0'),
                        'u' => out.push(self.unicode_escape(i)?),
                        '\n' => {} // line continuation
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }

        Err(RevalueError::Lex {
            position: start,
            details: "unterminated string literal".to_string(),
        })
    }

    fn unicode_escape(&mut self, position: usize) -> Result<char, RevalueError> {
        let invalid = || RevalueError::Lex {
            position,
            details: "invalid unicode escape".to_string(),
        };

        let mut code = String::new();
        if self.eat('{') {
            for (_, c) in self.chars.by_ref() {
                if c == '}' {
                    break;
                }
                code.push(c);
            }
        } else {
            for _ in 0..4 {
                code.push(self.chars.next().map(|(_, c)| c).ok_or_else(invalid)?);
            }
        }

        let value = u32::from_str_radix(&code, 16).map_err(|_| invalid())?;
        // Lone surrogates have no Rust char; substitute the replacement char
        Ok(char::from_u32(value).unwrap_or('\u{FFFD}'))
    }

    fn punct(&mut self, start: usize, ch: char) -> Result<Punct, RevalueError> {
        self.chars.next();
        let punct = match ch {
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            ',' => Punct::Comma,
            ':' => Punct::Colon,
            ';' => Punct::Semicolon,
            '.' => Punct::Dot,
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '?' if self.eat('?') => Punct::Nullish,
            '?' => Punct::Question,
            '<' if self.eat('=') => Punct::Le,
            '<' => Punct::Lt,
            '>' if self.eat('=') => Punct::Ge,
            '>' => Punct::Gt,
            '=' if self.eat('>') => Punct::Arrow,
            '=' if self.eat('=') => {
                if self.eat('=') {
                    Punct::StrictEq
                } else {
                    Punct::LooseEq
                }
            }
            '=' => Punct::Assign,
            '!' if self.eat('=') => {
                if self.eat('=') {
                    Punct::StrictNe
                } else {
                    Punct::LooseNe
                }
            }
            '!' => Punct::Bang,
            '&' if self.eat('&') => Punct::And,
            '|' if self.eat('|') => Punct::Or,
            other => {
                return Err(RevalueError::Lex {
                    position: start,
                    details: format!("unexpected character '{}'", other),
                })
            }
        };
        Ok(punct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_array_literal() {
        assert_eq!(
            kinds("[1, 2.5]"),
            vec![
                TokenKind::Punct(Punct::LBracket),
                TokenKind::Number(1.0),
                TokenKind::Punct(Punct::Comma),
                TokenKind::Number(2.5),
                TokenKind::Punct(Punct::RBracket),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_arrow_and_strict_eq() {
        assert_eq!(
            kinds("_ => a === b"),
            vec![
                TokenKind::Ident("_".into()),
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::StrictEq),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\nb" "A\u{1F600}""#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a\nb".into()),
                TokenKind::Str("A\u{1F600}".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_hex_and_exponent() {
        assert_eq!(
            kinds("0x1F 1e3 .5"),
            vec![
                TokenKind::Number(31.0),
                TokenKind::Number(1000.0),
                TokenKind::Number(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // one\n /* two */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn spans_cover_source() {
        let tokens = tokenize("ab  'c'").unwrap();
        assert_eq!(tokens[0].span, 0..2);
        assert_eq!(tokens[1].span, 4..7);
        assert_eq!(tokens[2].span, 7..7);
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(matches!(err, RevalueError::Lex { position: 0, .. }));
    }

    #[test]
    fn stray_character_is_lex_error() {
        let err = tokenize("a # b").unwrap_err();
        assert!(matches!(err, RevalueError::Lex { position: 2, .. }));
    }
}
