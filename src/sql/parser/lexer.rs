use std::iter::Peekable;
use std::str::Chars;

use crate::errinput;
use crate::error::Result;

/// The lexer (lexical analyzer) preprocesses raw SQL strings into a sequence of
/// lexical tokens (e.g. keyword, number, string, etc), which are passed on to
/// the SQL parser. In doing so, it strips away basic syntactic noise such as
/// whitespace and comments, which is irrelevant to the parser.
///
/// For example, the following string:
///
/// SELECT `id` FROM users WHERE name = 'ann'
///
/// Is transformed into the following tokens:
///
/// Keyword(Select), Ident("id"), Keyword(From), Ident("users"),
/// Keyword(Where), Ident("name"), Equal, String("ann")
///
/// The lexer does not care about the meaning of the tokens. That is the job of
/// the parser.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A numeric string, with digits, decimal points, and/or exponents. Leading
    /// signs (e.g. -) are separate tokens.
    Number(String),
    /// A string literal, with escapes resolved and quotes removed.
    String(String),
    /// An identifier. Unquoted identifiers are lowercased, backtick-quoted
    /// identifiers keep their case.
    Ident(String),
    /// A SQL keyword.
    Keyword(Keyword),
    Period,             // .
    Equal,              // =
    NotEqual,           // !=
    LessOrGreaterThan,  // <>
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    LessThan,           // <
    LessThanOrEqual,    // <=
    Plus,               // +
    Minus,              // -
    Asterisk,           // *
    Slash,              // /
    Percent,            // %
    OpenParen,          // (
    CloseParen,         // )
    Comma,              // ,
    Semicolon,          // ;
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Number(n) => n,
            Self::String(s) => return write!(f, "'{}'", s.replace('\'', "''")),
            Self::Ident(s) => s,
            Self::Keyword(k) => return write!(f, "{k}"),
            Self::Period => ".",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessOrGreaterThan => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Comma => ",",
            Self::Semicolon => ";",
        })
    }
}

impl From<Keyword> for Token {
    fn from(keyword: Keyword) -> Self {
        Self::Keyword(keyword)
    }
}

/// Reserved SQL keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    As,
    Asc,
    AutoIncrement,
    Bigint,
    Bool,
    Boolean,
    By,
    Char,
    Create,
    Default,
    Delete,
    Desc,
    Double,
    False,
    Float,
    From,
    In,
    Insert,
    Int,
    Integer,
    Into,
    Is,
    Key,
    Like,
    Limit,
    Not,
    Null,
    Offset,
    Or,
    Order,
    Primary,
    Select,
    Set,
    Smallint,
    String,
    Table,
    Text,
    Tinyint,
    True,
    Unique,
    Update,
    Values,
    Varchar,
    Where,
}

impl TryFrom<&str> for Keyword {
    // Use a cheap static error string. This just indicates it's not a keyword.
    type Error = &'static str;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        // Only compare lowercase, which is enforced by the lexer. This avoids
        // allocating a string to change the case.
        assert!(value.chars().all(|c| !c.is_uppercase()), "keyword must be lowercase");
        Ok(match value {
            "and" => Self::And,
            "as" => Self::As,
            "asc" => Self::Asc,
            "auto_increment" => Self::AutoIncrement,
            "bigint" => Self::Bigint,
            "bool" => Self::Bool,
            "boolean" => Self::Boolean,
            "by" => Self::By,
            "char" => Self::Char,
            "create" => Self::Create,
            "default" => Self::Default,
            "delete" => Self::Delete,
            "desc" => Self::Desc,
            "double" => Self::Double,
            "false" => Self::False,
            "float" => Self::Float,
            "from" => Self::From,
            "in" => Self::In,
            "insert" => Self::Insert,
            "int" => Self::Int,
            "integer" => Self::Integer,
            "into" => Self::Into,
            "is" => Self::Is,
            "key" => Self::Key,
            "like" => Self::Like,
            "limit" => Self::Limit,
            "not" => Self::Not,
            "null" => Self::Null,
            "offset" => Self::Offset,
            "or" => Self::Or,
            "order" => Self::Order,
            "primary" => Self::Primary,
            "select" => Self::Select,
            "set" => Self::Set,
            "smallint" => Self::Smallint,
            "string" => Self::String,
            "table" => Self::Table,
            "text" => Self::Text,
            "tinyint" => Self::Tinyint,
            "true" => Self::True,
            "unique" => Self::Unique,
            "update" => Self::Update,
            "values" => Self::Values,
            "varchar" => Self::Varchar,
            "where" => Self::Where,
            _ => return Err("not a keyword"),
        })
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display keywords as uppercase.
        f.write_str(match self {
            Self::And => "AND",
            Self::As => "AS",
            Self::Asc => "ASC",
            Self::AutoIncrement => "AUTO_INCREMENT",
            Self::Bigint => "BIGINT",
            Self::Bool => "BOOL",
            Self::Boolean => "BOOLEAN",
            Self::By => "BY",
            Self::Char => "CHAR",
            Self::Create => "CREATE",
            Self::Default => "DEFAULT",
            Self::Delete => "DELETE",
            Self::Desc => "DESC",
            Self::Double => "DOUBLE",
            Self::False => "FALSE",
            Self::Float => "FLOAT",
            Self::From => "FROM",
            Self::In => "IN",
            Self::Insert => "INSERT",
            Self::Int => "INT",
            Self::Integer => "INTEGER",
            Self::Into => "INTO",
            Self::Is => "IS",
            Self::Key => "KEY",
            Self::Like => "LIKE",
            Self::Limit => "LIMIT",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Offset => "OFFSET",
            Self::Or => "OR",
            Self::Order => "ORDER",
            Self::Primary => "PRIMARY",
            Self::Select => "SELECT",
            Self::Set => "SET",
            Self::Smallint => "SMALLINT",
            Self::String => "STRING",
            Self::Table => "TABLE",
            Self::Text => "TEXT",
            Self::Tinyint => "TINYINT",
            Self::True => "TRUE",
            Self::Unique => "UNIQUE",
            Self::Update => "UPDATE",
            Self::Values => "VALUES",
            Self::Varchar => "VARCHAR",
            Self::Where => "WHERE",
        })
    }
}

/// The lexer is used as a token iterator.
impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Result<Token>> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            // If there's any remaining chars, the lexer didn't recognize them.
            // Otherwise, we're done lexing.
            Ok(None) => self.chars.peek().map(|c| errinput!("unexpected character {c}")),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given string.
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer { chars: input.chars().peekable() }
    }

    /// Returns the next character if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        self.chars.peek().filter(|&&c| predicate(c))?;
        self.chars.next()
    }

    /// Consumes the next character if it's the given character.
    fn next_is(&mut self, c: char) -> bool {
        self.next_if(|n| n == c).is_some()
    }

    /// Applies a function to the next character, consuming it and returning
    /// the result if it's Some.
    fn next_if_map<T>(&mut self, map: impl Fn(char) -> Option<T>) -> Option<T> {
        let value = self.chars.peek().and_then(|&c| map(c))?;
        self.chars.next();
        Some(value)
    }

    /// Scans the next token, if any.
    fn scan(&mut self) -> Result<Option<Token>> {
        // Ignore whitespace and comments.
        self.skip_whitespace_and_comments()?;
        // The first character tells us the token type.
        match self.chars.peek() {
            Some('\'') | Some('"') => self.scan_string(),
            Some('`') => self.scan_ident_quoted(),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident_or_keyword()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Scans the next identifier or keyword, if any. It's converted to
    /// lowercase, by SQL convention.
    fn scan_ident_or_keyword(&mut self) -> Option<Token> {
        // The first character must be alphabetic or an underscore. The rest
        // can be numeric.
        let mut name = self.next_if(|c| c.is_alphabetic() || c == '_')?.to_lowercase().to_string();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_') {
            name.extend(c.to_lowercase())
        }
        // Check if the identifier matches a keyword.
        match Keyword::try_from(name.as_str()).ok() {
            Some(keyword) => Some(Token::Keyword(keyword)),
            None => Some(Token::Ident(name)),
        }
    }

    /// Scans the next backtick-quoted identifier, if any. Case is preserved,
    /// and a doubled backtick escapes a literal backtick.
    fn scan_ident_quoted(&mut self) -> Result<Option<Token>> {
        if !self.next_is('`') {
            return Ok(None);
        }
        let mut ident = String::new();
        loop {
            match self.chars.next() {
                Some('`') if self.next_is('`') => ident.push('`'),
                Some('`') => break,
                Some(c) => ident.push(c),
                None => return errinput!("unexpected end of quoted identifier"),
            }
        }
        Ok(Some(Token::Ident(ident)))
    }

    /// Scans the next number, if any.
    fn scan_number(&mut self) -> Option<Token> {
        // Scan the integer part. There must be one digit.
        let mut number = self.next_if(|c| c.is_ascii_digit())?.to_string();
        while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
            number.push(c)
        }
        // Scan the fractional part, if any.
        if self.next_is('.') {
            number.push('.');
            while let Some(dec) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(dec)
            }
        }
        // Scan the exponent, if any.
        if let Some(exp) = self.next_if(|c| c == 'e' || c == 'E') {
            number.push(exp);
            if let Some(sign) = self.next_if(|c| c == '+' || c == '-') {
                number.push(sign)
            }
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(c)
            }
        }
        Some(Token::Number(number))
    }

    /// Scans the next quoted string literal, if any. Both single and double
    /// quotes are accepted, as in MySQL. The quote character can be escaped
    /// by doubling it, and backslash escapes are resolved.
    fn scan_string(&mut self) -> Result<Option<Token>> {
        let Some(quote) = self.next_if(|c| c == '\'' || c == '"') else {
            return Ok(None);
        };
        let mut string = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote && self.next_is(quote) => string.push(quote),
                Some(c) if c == quote => break,
                Some('\\') => match self.chars.next() {
                    Some('n') => string.push('\n'),
                    Some('r') => string.push('\r'),
                    Some('t') => string.push('\t'),
                    Some('0') => string.push('\0'),
                    // Kept escaped, for use in LIKE patterns.
                    Some(c @ ('%' | '_')) => string.extend(['\\', c]),
                    Some(c) => string.push(c),
                    None => return errinput!("unexpected end of string literal"),
                },
                Some(c) => string.push(c),
                None => return errinput!("unexpected end of string literal"),
            }
        }
        Ok(Some(Token::String(string)))
    }

    /// Scans the next symbol token, if any.
    fn scan_symbol(&mut self) -> Option<Token> {
        let token = self.next_if_map(|c| {
            Some(match c {
                '.' => Token::Period,
                '=' => Token::Equal,
                '>' => Token::GreaterThan,
                '<' => Token::LessThan,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Asterisk,
                '/' => Token::Slash,
                '%' => Token::Percent,
                '(' => Token::OpenParen,
                ')' => Token::CloseParen,
                ',' => Token::Comma,
                ';' => Token::Semicolon,
                _ => return None,
            })
        });
        // Handle two-character tokens, e.g. !=.
        match token {
            Some(Token::GreaterThan) if self.next_is('=') => Some(Token::GreaterThanOrEqual),
            Some(Token::LessThan) if self.next_is('>') => Some(Token::LessOrGreaterThan),
            Some(Token::LessThan) if self.next_is('=') => Some(Token::LessThanOrEqual),
            None if self.chars.peek() == Some(&'!') => {
                // A lone ! is not a token, so we can't consume it without =.
                let mut lookahead = self.chars.clone();
                lookahead.next();
                if lookahead.peek() == Some(&'=') {
                    self.chars.next();
                    self.chars.next();
                    Some(Token::NotEqual)
                } else {
                    None
                }
            }
            token => token,
        }
    }

    /// Skips any whitespace, -- line comments, and /* */ block comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            while self.next_if(|c| c.is_whitespace()).is_some() {}
            let mut lookahead = self.chars.clone();
            match (lookahead.next(), lookahead.next()) {
                (Some('-'), Some('-')) => {
                    while self.next_if(|c| c != '\n').is_some() {}
                }
                (Some('/'), Some('*')) => {
                    self.chars.next();
                    self.chars.next();
                    loop {
                        match self.chars.next() {
                            Some('*') if self.next_is('/') => break,
                            Some(_) => {}
                            None => return errinput!("unterminated comment"),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}

/// Returns true if the entire given string is a single valid identifier that
/// can be written unquoted.
pub fn is_ident(ident: &str) -> bool {
    let mut lexer = Lexer::new(ident);
    let Some(Ok(Token::Ident(output))) = lexer.next() else {
        return false;
    };
    lexer.next().is_none() && output == ident
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(input: &str) -> Result<Vec<Token>> {
        Lexer::new(input).collect()
    }

    #[test]
    fn literal_string() {
        assert_eq!(
            scan(r#"'it''s' "say ""hi""" 'a\'b\nc'"#),
            Ok(vec![
                Token::String("it's".into()),
                Token::String(r#"say "hi""#.into()),
                Token::String("a'b\nc".into()),
            ])
        );
        assert!(scan("'unterminated").is_err());
    }

    #[test]
    fn literal_number() {
        assert_eq!(
            scan("0 1 3.14 293. -2.718 3.14e3 2.718E-2"),
            Ok(vec![
                Token::Number("0".into()),
                Token::Number("1".into()),
                Token::Number("3.14".into()),
                Token::Number("293.".into()),
                Token::Minus,
                Token::Number("2.718".into()),
                Token::Number("3.14e3".into()),
                Token::Number("2.718E-2".into()),
            ])
        )
    }

    #[test]
    fn idents() {
        assert_eq!(
            scan("Users `MixedCase` `a``b` _x1 SELECT"),
            Ok(vec![
                Token::Ident("users".into()),
                Token::Ident("MixedCase".into()),
                Token::Ident("a`b".into()),
                Token::Ident("_x1".into()),
                Keyword::Select.into(),
            ])
        );
    }

    #[test]
    fn symbols() {
        assert_eq!(
            scan("!= <> <= >= < > = ; -- trailing comment\n /* block */ ,"),
            Ok(vec![
                Token::NotEqual,
                Token::LessOrGreaterThan,
                Token::LessThanOrEqual,
                Token::GreaterThanOrEqual,
                Token::LessThan,
                Token::GreaterThan,
                Token::Equal,
                Token::Semicolon,
                Token::Comma,
            ])
        );
        assert!(scan("a ! b").is_err());
        assert!(scan("/* open").is_err());
    }

    #[test]
    fn select() {
        use Token::*;
        use super::Keyword;
        assert_eq!(
            scan("SELECT u.name AS n FROM users u WHERE u.age >= 18 ORDER BY n DESC LIMIT 1;"),
            Ok(vec![
                Keyword::Select.into(),
                Ident("u".into()),
                Period,
                Ident("name".into()),
                Keyword::As.into(),
                Ident("n".into()),
                Keyword::From.into(),
                Ident("users".into()),
                Ident("u".into()),
                Keyword::Where.into(),
                Ident("u".into()),
                Period,
                Ident("age".into()),
                GreaterThanOrEqual,
                Number("18".into()),
                Keyword::Order.into(),
                Keyword::By.into(),
                Ident("n".into()),
                Keyword::Desc.into(),
                Keyword::Limit.into(),
                Number("1".into()),
                Semicolon,
            ])
        )
    }

    #[test]
    fn is_ident() {
        assert!(super::is_ident("users"));
        assert!(!super::is_ident("Users"));
        assert!(!super::is_ident("select"));
        assert!(!super::is_ident("a b"));
    }
}
