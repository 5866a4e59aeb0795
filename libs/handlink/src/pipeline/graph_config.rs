// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Text graph configuration.
//!
//! The format is a small subset of protobuf text format:
//!
//! ```text
//! # comment
//! input_stream: "input_video"
//! num_landmarks: 21
//! landmark { x: 0.1 y: 0.1 }
//! ```
//!
//! Keys may repeat. Values are kept as text; the graph that consumes the
//! config decides what each key means.

use std::str::FromStr;

use crate::core::{HandlinkError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Scalar(String),
    Block(ConfigBlock),
}

/// Ordered `key -> value` entries of one nesting level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigBlock {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigBlock {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First scalar stored under `key`.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match v {
            ConfigValue::Scalar(s) if k == key => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn blocks<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ConfigBlock> + 'a {
        self.entries.iter().filter_map(move |(k, v)| match v {
            ConfigValue::Block(b) if k == key => Some(b),
            _ => None,
        })
    }

    /// Parse the first scalar under `key`. `Ok(None)` when absent.
    pub fn parse_scalar<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.scalar(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    HandlinkError::ConfigParse(format!("invalid value '{}' for '{}': {}", raw, key, e))
                })
            })
            .transpose()
    }
}

/// Parsed graph configuration plus the text it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphConfig {
    source: String,
    root: ConfigBlock,
}

impl GraphConfig {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.block(None)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn root(&self) -> &ConfigBlock {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(String),
    Colon,
    Open,
    Close,
}

struct Spanned {
    token: Token,
    line: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | '/')
}

fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() || c == ',' || c == ';' => {
                chars.next();
            }
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ':' => {
                chars.next();
                tokens.push(Spanned { token: Token::Colon, line });
            }
            '{' | '<' => {
                chars.next();
                tokens.push(Spanned { token: Token::Open, line });
            }
            '}' | '>' => {
                chars.next();
                tokens.push(Spanned { token: Token::Close, line });
            }
            '"' | '\'' => {
                let quote = c;
                let start_line = line;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(escaped) => text.push(escaped),
                            None => {
                                return Err(HandlinkError::ConfigParse(format!(
                                    "line {}: unterminated string",
                                    start_line
                                )));
                            }
                        },
                        Some('\n') | None => {
                            return Err(HandlinkError::ConfigParse(format!(
                                "line {}: unterminated string",
                                start_line
                            )));
                        }
                        Some(c) => text.push(c),
                    }
                }
                tokens.push(Spanned {
                    token: Token::Literal(text),
                    line: start_line,
                });
            }
            c if is_bare_char(c) => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_bare_char(c) {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                let token = if text.starts_with(is_ident_start) {
                    Token::Ident(text)
                } else {
                    Token::Literal(text)
                };
                tokens.push(Spanned { token, line });
            }
            other => {
                return Err(HandlinkError::ConfigParse(format!(
                    "line {}: unexpected character '{}'",
                    line, other
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    /// Parse entries until the matching close (`opened_at` is the line of the
    /// open brace) or end of input at the top level.
    fn block(&mut self, opened_at: Option<usize>) -> Result<ConfigBlock> {
        let mut block = ConfigBlock::default();

        loop {
            let Some(next) = self.advance() else {
                return match opened_at {
                    None => Ok(block),
                    Some(line) => Err(HandlinkError::ConfigParse(format!(
                        "line {}: unclosed block",
                        line
                    ))),
                };
            };
            let line = next.line;
            let key = match &next.token {
                Token::Close if opened_at.is_some() => return Ok(block),
                Token::Close => {
                    return Err(HandlinkError::ConfigParse(format!(
                        "line {}: unmatched closing brace",
                        line
                    )));
                }
                Token::Ident(key) => key.clone(),
                other => {
                    return Err(HandlinkError::ConfigParse(format!(
                        "line {}: expected a field name, found {:?}",
                        line, other
                    )));
                }
            };

            let has_colon = matches!(self.peek(), Some(Spanned { token: Token::Colon, .. }));
            if has_colon {
                self.pos += 1;
            }

            let value = match self.advance().map(|t| (t.token.clone(), t.line)) {
                Some((Token::Open, open_line)) => ConfigValue::Block(self.block(Some(open_line))?),
                Some((Token::Ident(text) | Token::Literal(text), _)) if has_colon => {
                    ConfigValue::Scalar(text)
                }
                Some((other, at)) => {
                    return Err(HandlinkError::ConfigParse(format!(
                        "line {}: unexpected {:?} after '{}'",
                        at, other, key
                    )));
                }
                None => {
                    return Err(HandlinkError::ConfigParse(format!(
                        "line {}: missing value for '{}'",
                        self.last_line(),
                        key
                    )));
                }
            };
            block.entries.push((key, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOPBACK: &str = r#"
# Stock CPU loopback
input_stream: "input_video"
output_stream: "output_video"
landmark_stream: landmarks
num_landmarks: 21
landmark { x: 0.25 y: 0.5 z: -0.01 }
landmark { x: 0.75, y: 0.5 }
"#;

    #[test]
    fn test_parse_scalars_and_blocks() {
        let config = GraphConfig::parse(LOOPBACK).unwrap();
        let root = config.root();
        assert_eq!(root.scalar("input_stream"), Some("input_video"));
        assert_eq!(root.scalar("landmark_stream"), Some("landmarks"));
        assert_eq!(root.parse_scalar::<usize>("num_landmarks").unwrap(), Some(21));

        let points: Vec<_> = root.blocks("landmark").collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].parse_scalar::<f32>("z").unwrap(), Some(-0.01));
        assert_eq!(points[1].scalar("x"), Some("0.75"));
        assert_eq!(config.source(), LOOPBACK);
    }

    #[test]
    fn test_scalar_outlives_key() {
        let config = GraphConfig::parse("input_stream: \"a\"\ninput_stream: \"b\"\n").unwrap();
        let value = {
            let key = String::from("input_stream");
            config.root().scalar(&key)
        };
        assert_eq!(value, Some("a"));
    }

    #[test]
    fn test_empty_text_is_empty_config() {
        let config = GraphConfig::parse("  # nothing here\n").unwrap();
        assert!(config.root().is_empty());
    }

    #[test]
    fn test_unclosed_block() {
        let err = GraphConfig::parse("node {\n  calculator: \"X\"\n").unwrap_err();
        assert!(matches!(err, HandlinkError::ConfigParse(msg) if msg.contains("line 1")));
    }

    #[test]
    fn test_stray_close() {
        assert!(GraphConfig::parse("a: 1 }").is_err());
    }

    #[test]
    fn test_missing_value() {
        assert!(GraphConfig::parse("input_stream:").is_err());
        assert!(GraphConfig::parse("input_stream \"x\"").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        assert!(GraphConfig::parse("input_stream: \"input_video\n").is_err());
    }

    #[test]
    fn test_bad_number() {
        let config = GraphConfig::parse("num_landmarks: many").unwrap();
        assert!(config.root().parse_scalar::<usize>("num_landmarks").is_err());
    }
}
