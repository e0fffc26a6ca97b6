//! Scan a VOLT source, producing a sequence of tokens.
//!
//! VOLT sources have a very small lexical grammar: quoted strings, and
//! whitespace-separated words. Keywords, numbers, and bare glyph names are
//! all words; telling them apart is left to the parser.

use crate::ast::Location;

const EOF: u8 = 0x0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Kind {
    Word,
    String,
    StringUnterminated,
    Eof,
}

/// A token, with the byte range of its contents.
///
/// For strings the range excludes the quotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: Kind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) location: Location,
}

pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn nth(&self, index: usize) -> u8 {
        self.input
            .as_bytes()
            .get(self.pos + index)
            .copied()
            .unwrap_or(EOF)
    }

    fn bump(&mut self) -> Option<u8> {
        let next = self.input.as_bytes().get(self.pos).copied();
        if let Some(byte) = next {
            self.pos += 1;
            if byte == b'\n' {
                self.line += 1;
                self.line_start = self.pos;
            }
        }
        next
    }

    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: (self.input[self.line_start..self.pos].chars().count() + 1) as u32,
        }
    }

    pub(crate) fn next_token(&mut self) -> Token {
        while is_ascii_whitespace(self.nth(0)) {
            self.bump();
        }
        let location = self.location();
        let start = self.pos;
        match self.nth(0) {
            EOF if self.pos >= self.input.len() => Token {
                kind: Kind::Eof,
                start,
                end: start,
                location,
            },
            b'"' => {
                self.bump();
                let content_start = self.pos;
                loop {
                    match self.bump() {
                        Some(b'"') => {
                            break Token {
                                kind: Kind::String,
                                start: content_start,
                                end: self.pos - 1,
                                location,
                            }
                        }
                        Some(_) => (),
                        None => {
                            break Token {
                                kind: Kind::StringUnterminated,
                                start: content_start,
                                end: self.pos,
                                location,
                            }
                        }
                    }
                }
            }
            _ => {
                while !is_ascii_whitespace(self.nth(0))
                    && self.nth(0) != b'"'
                    && self.pos < self.input.len()
                {
                    self.bump();
                }
                Token {
                    kind: Kind::Word,
                    start,
                    end: self.pos,
                    location,
                }
            }
        }
    }

    pub(crate) fn text(&self, token: &Token) -> &'a str {
        &self.input[token.start..token.end]
    }
}

fn is_ascii_whitespace(byte: u8) -> bool {
    byte == b' ' || (0x9..=0xD).contains(&byte)
}

#[cfg(test)]
pub(crate) fn tokenize(text: &str) -> Vec<(Kind, &str)> {
    let mut lexer = Lexer::new(text);
    std::iter::from_fn(|| {
        let token = lexer.next_token();
        (token.kind != Kind::Eof).then(|| (token.kind, lexer.text(&token)))
    })
    .collect()
}
