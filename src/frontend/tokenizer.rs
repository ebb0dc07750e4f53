use crate::error::{Error, Result};

use super::token::{Token, TokenType};

pub struct Tokenizer;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')
}

impl Tokenizer {
    /// Splits IR text into tokens. Newlines are significant (one instruction
    /// per line) and are kept as tokens; `;` comments are dropped.
    pub fn tokenize(input: &str) -> Result<Vec<Token>> {
        let mut position = 0;
        let mut line = 1;
        let mut tokens = Vec::new();

        while position < input.len() {
            position = Self::next_token(input, position, &mut line, &mut tokens)?;
        }

        tokens.push(Token::new(TokenType::Eof, "", line));
        Ok(tokens)
    }

    fn peek(input: &str, position: usize) -> Option<char> {
        input[position..].chars().next()
    }

    fn take_while(input: &str, mut position: usize, pred: impl Fn(char) -> bool) -> usize {
        while let Some(c) = Self::peek(input, position) {
            if !pred(c) {
                break;
            }
            position += c.len_utf8();
        }
        position
    }

    // Try to extract the next token from the input starting at position
    fn next_token(
        input: &str,
        position: usize,
        line: &mut usize,
        tokens: &mut Vec<Token>,
    ) -> Result<usize> {
        let Some(next_char) = Self::peek(input, position) else {
            return Ok(position);
        };

        match next_char {
            ' ' | '\t' | '\r' => Ok(position + 1),
            '\n' => {
                tokens.push(Token::new(TokenType::Newline, "", *line));
                *line += 1;
                Ok(position + 1)
            }
            ';' => Ok(Self::take_while(input, position, |c| c != '\n')),
            '%' | '@' => {
                let r#type = if next_char == '%' {
                    TokenType::LocalIdent
                } else {
                    TokenType::GlobalIdent
                };
                let start = position + 1;
                if Self::peek(input, start) == Some('"') {
                    let (text, end) = Self::quoted(input, start, *line)?;
                    tokens.push(Token::new(r#type, text, *line));
                    return Ok(end);
                }
                let end = Self::take_while(input, start, is_name_char);
                if end == start {
                    return Err(Error::parse(
                        *line,
                        format!("expected a name after `{next_char}`"),
                    ));
                }
                tokens.push(Token::new(r#type, &input[start..end], *line));
                Ok(end)
            }
            '"' => {
                let (text, end) = Self::quoted(input, position, *line)?;
                tokens.push(Token::new(TokenType::String, text, *line));
                Ok(end)
            }
            c if c.is_ascii_digit()
                || (c == '-'
                    && Self::peek(input, position + 1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                let end = Self::take_while(input, position + 1, |d| d.is_ascii_digit());
                tokens.push(Token::new(
                    TokenType::Integer,
                    &input[position..end],
                    *line,
                ));
                Ok(end)
            }
            // Attribute groups (`#0`), metadata (`!dbg`) and varargs (`...`)
            // are only ever skipped, so they travel as plain words.
            c if c.is_ascii_alphabetic() || matches!(c, '_' | '#' | '!' | '.') => {
                let end = Self::take_while(input, position + 1, is_word_char);
                tokens.push(Token::new(TokenType::Word, &input[position..end], *line));
                Ok(end)
            }
            _ => {
                let r#type = match next_char {
                    '=' => TokenType::Equal,
                    ',' => TokenType::Comma,
                    ':' => TokenType::Colon,
                    '*' => TokenType::Star,
                    '(' => TokenType::LeftParen,
                    ')' => TokenType::RightParen,
                    '{' => TokenType::LeftBrace,
                    '}' => TokenType::RightBrace,
                    '[' => TokenType::LeftBracket,
                    ']' => TokenType::RightBracket,
                    other => {
                        return Err(Error::parse(*line, format!("invalid character: {other}")));
                    }
                };
                tokens.push(Token::new(r#type, next_char.to_string(), *line));
                Ok(position + 1)
            }
        }
    }

    /// Reads a `"..."` string starting at `position`, returning its contents
    /// and the position after the closing quote.
    fn quoted(input: &str, position: usize, line: usize) -> Result<(String, usize)> {
        let start = position + 1;
        let end = Self::take_while(input, start, |c| c != '"' && c != '\n');
        if Self::peek(input, end) != Some('"') {
            return Err(Error::parse(line, "unterminated string"));
        }
        Ok((input[start..end].to_string(), end + 1))
    }
}
