use std::fmt;

#[derive(Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenType {
    // Single character tokens
    Equal,
    Comma,
    Colon,
    Star,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    // Names
    /// `%name`
    LocalIdent,
    /// `@name`
    GlobalIdent,
    /// Keywords, type names, labels, attributes.
    Word,
    // Literals
    Integer,
    String,
    Newline,
    #[default]
    Eof,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub r#type: TokenType,
    /// Source text without sigils or quotes.
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(r#type: TokenType, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            r#type,
            lexeme: lexeme.into(),
            line,
        }
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.r#type == TokenType::Word && self.lexeme == word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.r#type {
            TokenType::Equal => f.write_str("="),
            TokenType::Comma => f.write_str(","),
            TokenType::Colon => f.write_str(":"),
            TokenType::Star => f.write_str("*"),
            TokenType::LeftParen => f.write_str("("),
            TokenType::RightParen => f.write_str(")"),
            TokenType::LeftBrace => f.write_str("{"),
            TokenType::RightBrace => f.write_str("}"),
            TokenType::LeftBracket => f.write_str("["),
            TokenType::RightBracket => f.write_str("]"),
            TokenType::LocalIdent => write!(f, "%{}", self.lexeme),
            TokenType::GlobalIdent => write!(f, "@{}", self.lexeme),
            TokenType::Word | TokenType::Integer => f.write_str(&self.lexeme),
            TokenType::String => write!(f, "\"{}\"", self.lexeme),
            TokenType::Newline => f.write_str("newline"),
            TokenType::Eof => f.write_str("eof"),
        }
    }
}
