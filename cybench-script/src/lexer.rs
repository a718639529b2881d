use crate::error::{ParseError, Position};

const PUNCT: &[char] = &['\\', '(', ')', ',', ':', ';', '*', '+', '-', '/'];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Punct(char),
    Newline,
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("'{name}'"),
            Self::Int(value) => format!("'{value}'"),
            Self::Float(value) => format!("'{value}'"),
            Self::Punct(ch) => format!("'{ch}'"),
            Self::Newline => "newline".to_string(),
            Self::Eof => "end of script".to_string(),
        }
    }
}

/// Character-level cursor over a script source. Newlines are significant
/// (they terminate meta-commands), so they are produced as tokens rather
/// than skipped with the rest of the whitespace.
#[derive(Clone)]
pub(crate) struct Cursor<'a> {
    file: &'a str,
    src: &'a str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(file: &'a str, src: &'a str) -> Self {
        Self {
            file,
            src,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub(crate) fn position(&self) -> Position {
        Position {
            file: self.file.to_string(),
            line: self.line,
            col: self.col,
        }
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Skips horizontal whitespace. Newlines stay put.
    pub(crate) fn skip_blank(&mut self) {
        while matches!(self.peek_char(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<(Token, Position), ParseError> {
        self.skip_blank();
        let position = self.position();

        let Some(ch) = self.peek_char() else {
            return Ok((Token::Eof, position));
        };

        if ch == '\n' {
            self.bump();
            return Ok((Token::Newline, position));
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                self.bump();
            }
            let text = &self.src[start..self.pos];
            return Ok((Token::Ident(text.to_string()), position));
        }

        if ch.is_ascii_digit() {
            let start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }

            // A dot followed by a digit extends the literal to a float.
            let mut is_float = false;
            if self.peek_char() == Some('.') {
                let mut ahead = self.clone();
                ahead.bump();
                if matches!(ahead.peek_char(), Some(c) if c.is_ascii_digit()) {
                    is_float = true;
                    self.bump();
                    while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                        self.bump();
                    }
                }
            }

            let text = &self.src[start..self.pos];
            if is_float {
                let value: f64 = text.parse().map_err(|_| {
                    ParseError::new(position.clone(), format!("invalid float literal: {text}"))
                })?;
                return Ok((Token::Float(value), position));
            }
            let value: i64 = text.parse().map_err(|_| {
                ParseError::new(
                    position.clone(),
                    format!("integer literal out of range: {text}"),
                )
            })?;
            return Ok((Token::Int(value), position));
        }

        if PUNCT.contains(&ch) {
            self.bump();
            return Ok((Token::Punct(ch), position));
        }

        Err(ParseError::new(
            position,
            format!("unexpected character '{ch}'"),
        ))
    }

    pub(crate) fn peek_token(&self) -> Result<(Token, Position), ParseError> {
        self.clone().next_token()
    }

    /// Captures a query body verbatim, from the current position up to the
    /// terminating `;`. The semicolon is consumed but excluded from the text.
    pub(crate) fn read_query_text(&mut self) -> Result<String, ParseError> {
        let start_position = self.position();
        let start = self.pos;
        loop {
            match self.peek_char() {
                Some(';') => {
                    let text = self.src[start..self.pos].to_string();
                    self.bump();
                    return Ok(text);
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(ParseError::new(
                        start_position,
                        "unexpected end of script, expected ';'",
                    ));
                }
            }
        }
    }
}
