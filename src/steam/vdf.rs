// SPDX-License-Identifier: GPL-3.0-only
//! Reader for Valve's text KeyValues format, as returned in product info.
//!
//! Every leaf becomes a JSON string and every block a JSON object; repeated
//! keys keep the last value.

use serde_json::{Map, Value};
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VdfError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
}

#[derive(Debug, PartialEq)]
enum Token {
    Text(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '\0' {
                self.chars.next();
            } else if c == '/' {
                let mut ahead = self.chars.clone();
                ahead.next();
                if matches!(ahead.peek(), Some((_, '/'))) {
                    for (_, c) in self.chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                } else {
                    return;
                }
            } else {
                return;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<(usize, Token)>, VdfError> {
        self.skip_trivia();

        let Some((offset, c)) = self.chars.next() else {
            return Ok(None);
        };

        let token = match c {
            '{' => Token::Open,
            '}' => Token::Close,
            '"' => Token::Text(self.quoted(offset)?),
            _ => {
                let mut text = String::from(c);
                while let Some(&(_, c)) = self.chars.peek() {
                    if c.is_whitespace() || matches!(c, '{' | '}' | '"' | '\0') {
                        break;
                    }
                    text.push(c);
                    self.chars.next();
                }
                Token::Text(text)
            }
        };

        Ok(Some((offset, token)))
    }

    fn quoted(&mut self, start: usize) -> Result<String, VdfError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                None => return Err(VdfError::UnterminatedString(start)),
                Some((_, '"')) => return Ok(text),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, other)) => text.push(other),
                    None => return Err(VdfError::UnterminatedString(start)),
                },
                Some((_, c)) => text.push(c),
            }
        }
    }
}

/// Parse a KeyValues document into a JSON object of its top-level keys
pub fn parse(input: &str) -> Result<Value, VdfError> {
    let mut lexer = Lexer::new(input);
    let root = parse_block(&mut lexer, false)?;
    Ok(Value::Object(root))
}

fn parse_block(lexer: &mut Lexer<'_>, nested: bool) -> Result<Map<String, Value>, VdfError> {
    let mut map = Map::new();

    loop {
        let key = match lexer.next_token()? {
            None if nested => return Err(VdfError::UnexpectedEnd),
            None => return Ok(map),
            Some((_, Token::Close)) if nested => return Ok(map),
            Some((offset, Token::Close)) => {
                return Err(VdfError::Unexpected { found: '}', offset });
            }
            Some((offset, Token::Open)) => {
                return Err(VdfError::Unexpected { found: '{', offset });
            }
            Some((_, Token::Text(key))) => key,
        };

        let value = match lexer.next_token()? {
            None => return Err(VdfError::UnexpectedEnd),
            Some((_, Token::Text(text))) => Value::String(text),
            Some((_, Token::Open)) => Value::Object(parse_block(lexer, true)?),
            Some((offset, Token::Close)) => {
                return Err(VdfError::Unexpected { found: '}', offset });
            }
        };

        map.insert(key, value);
    }
}
