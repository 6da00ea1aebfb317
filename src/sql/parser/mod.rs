//! Parses raw SQL strings into a structured Abstract Syntax Tree.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::{Keyword, Lexer, Token, is_ident};
pub use parser::Parser;

/// Formats an identifier for use in SQL, quoting it with backticks if it is
/// not a plain lowercase identifier or collides with a keyword.
pub fn format_ident(ident: &str) -> String {
    if is_ident(ident) {
        return ident.to_string();
    }
    format!("`{}`", ident.replace('`', "``"))
}
