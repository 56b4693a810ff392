//! Single-pass placeholder scanner.

use std::collections::BTreeSet;

use super::{ParameterInterpretation, ParameterKey, ParameterOccurrence};
use crate::error::{QueryError, Result};

/// Finds the parameters of `sql`, skipping string literals, quoted
/// identifiers and comments.
///
/// Recognized forms are JDBC-style `?`, ordinal `?1` and named `:name`;
/// `::` is a cast and stays as written. A statement must use one form only.
///
/// # Errors
///
/// Returns [`QueryError::Syntax`] for unterminated literals and comments or
/// an ordinal label of zero, and [`QueryError::MixedParameterStyles`] when
/// forms are combined.
pub fn recognize(sql: &str) -> Result<ParameterInterpretation> {
    Recognizer::new(sql).run()
}

#[derive(Debug, Default, Clone, Copy)]
struct Styles {
    jdbc: bool,
    ordinal: bool,
    named: bool,
}

struct Recognizer<'a> {
    input: &'a str,
    pos: usize,
    adjusted: String,
    occurrences: Vec<ParameterOccurrence>,
    parameters: BTreeSet<ParameterKey>,
    jdbc_count: u32,
    styles: Styles,
}

impl<'a> Recognizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            adjusted: String::with_capacity(input.len()),
            occurrences: Vec::new(),
            parameters: BTreeSet::new(),
            jdbc_count: 0,
            styles: Styles::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Copies the next character to the output.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        self.adjusted.push(c);
        Some(c)
    }

    fn run(mut self) -> Result<ParameterInterpretation> {
        while let Some(c) = self.peek() {
            match c {
                '\'' | '"' | '`' => self.copy_quoted(c)?,
                '-' if self.peek_next() == Some('-') => self.copy_line_comment(),
                '/' if self.peek_next() == Some('*') => self.copy_block_comment()?,
                '?' => self.ordinal_or_jdbc()?,
                ':' if self.peek_next() == Some(':') => {
                    self.advance();
                    self.advance();
                }
                ':' if self.peek_next().is_some_and(|n| n.is_alphabetic() || n == '_') => {
                    self.named();
                }
                _ => {
                    self.advance();
                }
            }
        }

        let Styles {
            jdbc,
            ordinal,
            named,
        } = self.styles;
        if [jdbc, ordinal, named].iter().filter(|seen| **seen).count() > 1 {
            let used: Vec<&str> = [(jdbc, "`?`"), (ordinal, "`?N`"), (named, "`:name`")]
                .iter()
                .filter_map(|(seen, form)| seen.then_some(*form))
                .collect();
            return Err(QueryError::MixedParameterStyles(used.join(", ")));
        }

        Ok(ParameterInterpretation {
            adjusted_sql: self.adjusted,
            occurrences: self.occurrences,
            parameters: self.parameters,
        })
    }

    fn copy_quoted(&mut self, quote: char) -> Result<()> {
        let start = self.pos;
        self.advance();
        loop {
            match self.advance() {
                // doubled quote is an escaped quote
                Some(c) if c == quote && self.peek() == Some(quote) => {
                    self.advance();
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
                None => {
                    return Err(QueryError::Syntax {
                        position: start,
                        message: format!("unterminated {quote}-quoted text"),
                    });
                }
            }
        }
    }

    fn copy_line_comment(&mut self) {
        while let Some(c) = self.advance() {
            if c == '\n' {
                break;
            }
        }
    }

    fn copy_block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        self.advance();
        self.advance();
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(QueryError::Syntax {
                        position: start,
                        message: "unterminated block comment".to_string(),
                    });
                }
            }
        }
    }

    fn ordinal_or_jdbc(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        let key = if self.pos == digits_start {
            self.styles.jdbc = true;
            self.jdbc_count += 1;
            ParameterKey::Positional(self.jdbc_count)
        } else {
            self.styles.ordinal = true;
            let label = &self.input[digits_start..self.pos];
            match label.parse::<u32>() {
                Ok(position) if position > 0 => ParameterKey::Positional(position),
                _ => {
                    return Err(QueryError::Syntax {
                        position: start,
                        message: format!("invalid ordinal parameter label ?{label}"),
                    });
                }
            }
        };
        self.push_placeholder(key);
        Ok(())
    }

    fn named(&mut self) {
        self.pos += 1;
        let name_start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += self.peek().map_or(1, char::len_utf8);
        }
        self.styles.named = true;
        let name = self.input[name_start..self.pos].to_string();
        self.push_placeholder(ParameterKey::Named(name));
    }

    fn push_placeholder(&mut self, key: ParameterKey) {
        self.occurrences.push(ParameterOccurrence {
            key: key.clone(),
            source_position: Some(self.adjusted.len()),
        });
        self.parameters.insert(key);
        self.adjusted.push('?');
    }
}
