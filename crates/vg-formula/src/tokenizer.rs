//! # Tokenizer
//!
//! Splits statement text into words, quoted literals and separators. The
//! separator set is whitespace, `(`, `)`, `,`, `+`, `/`, `<`, `>` and the
//! quote character. Runs of whitespace collapse into one [`Separator::Space`].
//!
//! A quoted literal runs to the next unpaired `'`; a doubled `''` inside it
//! stands for one quote.
//!
//! In [`ScanMode::ParenthesesOnly`] the scanner reports nothing but
//! parentheses outside quoted regions. The `EXISTS` capture uses it to find
//! the end of a sub-query without interpreting its contents.

use crate::error::{ParseError, ParseResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Space,
    OpenParen,
    CloseParen,
    Comma,
    Plus,
    Slash,
    Less,
    Greater,
}

impl Separator {
    fn of(c: char) -> Option<Self> {
        match c {
            '(' => Some(Self::OpenParen),
            ')' => Some(Self::CloseParen),
            ',' => Some(Self::Comma),
            '+' => Some(Self::Plus),
            '/' => Some(Self::Slash),
            '<' => Some(Self::Less),
            '>' => Some(Self::Greater),
            c if c.is_whitespace() => Some(Self::Space),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Space => " ",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Comma => ",",
            Self::Plus => "+",
            Self::Slash => "/",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Word { text: &'a str, offset: usize },
    /// Literal with its quotes stripped and `''` unescaped.
    Quoted { text: String, offset: usize },
    Separator { separator: Separator, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Normal,
    ParenthesesOnly,
}

const QUOTE: char = '\'';

pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn next_token(&mut self, mode: ScanMode) -> ParseResult<Option<Token<'a>>> {
        match mode {
            ScanMode::Normal => self.next_normal(),
            ScanMode::ParenthesesOnly => self.next_parenthesis(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn next_normal(&mut self) -> ParseResult<Option<Token<'a>>> {
        let Some(c) = self.rest().chars().next() else {
            return Ok(None);
        };
        let offset = self.pos;

        if c == QUOTE {
            let text = self.quoted()?;
            return Ok(Some(Token::Quoted { text, offset }));
        }

        if let Some(separator) = Separator::of(c) {
            self.pos += c.len_utf8();
            if separator == Separator::Space {
                let skipped = self
                    .rest()
                    .find(|c: char| !c.is_whitespace())
                    .unwrap_or(self.rest().len());
                self.pos += skipped;
            }
            return Ok(Some(Token::Separator { separator, offset }));
        }

        let len = self
            .rest()
            .find(|c: char| c == QUOTE || Separator::of(c).is_some())
            .unwrap_or(self.rest().len());
        self.pos += len;
        Ok(Some(Token::Word {
            text: &self.text[offset..offset + len],
            offset,
        }))
    }

    fn next_parenthesis(&mut self) -> ParseResult<Option<Token<'a>>> {
        while let Some(c) = self.rest().chars().next() {
            let offset = self.pos;
            match c {
                QUOTE => {
                    self.quoted()?;
                }
                '(' | ')' => {
                    self.pos += 1;
                    let separator = if c == '(' {
                        Separator::OpenParen
                    } else {
                        Separator::CloseParen
                    };
                    return Ok(Some(Token::Separator { separator, offset }));
                }
                _ => self.pos += c.len_utf8(),
            }
        }
        Ok(None)
    }

    /// Consume a quoted literal starting at the current position.
    fn quoted(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.pos += QUOTE.len_utf8();
        let mut text = String::new();
        loop {
            let Some(end) = self.rest().find(QUOTE) else {
                return Err(ParseError::UnterminatedQuote(start));
            };
            text.push_str(&self.rest()[..end]);
            self.pos += end + QUOTE.len_utf8();
            if self.rest().starts_with(QUOTE) {
                text.push(QUOTE);
                self.pos += QUOTE.len_utf8();
            } else {
                return Ok(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<Token<'_>> {
        let mut scanner = Scanner::new(text);
        let mut tokens = Vec::new();
        while let Some(token) = scanner.next_token(ScanMode::Normal).unwrap() {
            tokens.push(token);
        }
        tokens
    }

    fn word(text: &str, offset: usize) -> Token<'_> {
        Token::Word { text, offset }
    }

    fn sep(separator: Separator, offset: usize) -> Token<'static> {
        Token::Separator { separator, offset }
    }

    #[test]
    fn test_words_and_separators() {
        assert_eq!(
            scan("a>=1"),
            vec![word("a", 0), sep(Separator::Greater, 1), word("=1", 2)]
        );
        assert_eq!(
            scan("max(x),  y"),
            vec![
                word("max", 0),
                sep(Separator::OpenParen, 3),
                word("x", 4),
                sep(Separator::CloseParen, 5),
                sep(Separator::Comma, 6),
                sep(Separator::Space, 7),
                word("y", 9),
            ]
        );
    }

    #[test]
    fn test_quoted_literal() {
        assert_eq!(
            scan("name = 'it''s, (x)'"),
            vec![
                word("name", 0),
                sep(Separator::Space, 4),
                word("=", 5),
                sep(Separator::Space, 6),
                Token::Quoted {
                    text: "it's, (x)".to_string(),
                    offset: 7
                },
            ]
        );
        assert_eq!(
            scan("''"),
            vec![Token::Quoted {
                text: String::new(),
                offset: 0
            }]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let mut scanner = Scanner::new("a = 'abc");
        let mut result = Ok(None);
        for _ in 0..5 {
            result = scanner.next_token(ScanMode::Normal);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(ParseError::UnterminatedQuote(4)));
    }

    #[test]
    fn test_parentheses_only_skips_quotes() {
        let mut scanner = Scanner::new("select ')' from (t)) rest");
        let mut parens = Vec::new();
        while let Some(token) = scanner.next_token(ScanMode::ParenthesesOnly).unwrap() {
            parens.push(token);
        }
        assert_eq!(
            parens,
            vec![
                sep(Separator::OpenParen, 16),
                sep(Separator::CloseParen, 18),
                sep(Separator::CloseParen, 19),
            ]
        );
    }
}
