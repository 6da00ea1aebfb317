use std::iter::Peekable;
use std::ops::Add;

use indexmap::IndexMap;

use super::{Keyword, Lexer, Token, ast};
use crate::errinput;
use crate::error::Result;
use crate::sql::types::DataType;

/// The SQL parser takes tokens from the lexer and parses the SQL syntax into an
/// Abstract Syntax Tree (AST).
///
/// The AST represents the syntactic structure of a SQL query (e.g. the SELECT
/// and FROM clauses, values, arithmetic expressions, etc.). However, it only
/// ensures the syntax is well-formed, and does not know whether e.g. a given
/// table or column exists. That is checked when the statement is executed.
pub struct Parser<'a> {
    pub lexer: Peekable<Lexer<'a>>,
}

impl Parser<'_> {
    /// Parses the input string into a SQL statement AST. The entire string must
    /// be parsed as a single statement, ending with an optional semicolon.
    pub fn parse(statement: &str) -> Result<ast::Statement> {
        let mut parser = Self::new(statement);
        let statement = parser.parse_statement()?;
        parser.skip(Token::Semicolon);
        if let Some(token) = parser.lexer.next().transpose()? {
            return errinput!("unexpected token {token}");
        }
        Ok(statement)
    }

    /// Parses the input string into a sequence of SQL statements separated by
    /// semicolons. Used to load schema files.
    pub fn parse_many(statements: &str) -> Result<Vec<ast::Statement>> {
        let mut parser = Self::new(statements);
        let mut parsed = Vec::new();
        loop {
            while parser.next_is(Token::Semicolon) {}
            if parser.peek()?.is_none() {
                break;
            }
            parsed.push(parser.parse_statement()?);
            if parser.peek()?.is_some() {
                parser.expect(Token::Semicolon)?;
            }
        }
        Ok(parsed)
    }

    /// Parse the input string into a SQL expression AST. The entire string must
    /// be parsed as a single expression. Only used in tests.
    #[cfg(test)]
    pub fn parse_expr(expr: &str) -> Result<ast::Expression> {
        let mut parser = Self::new(expr);
        let expression = parser.parse_expression()?;
        if let Some(token) = parser.lexer.next().transpose()? {
            return errinput!("unexpected token {token}");
        }
        Ok(expression)
    }

    /// Creates a new parser for the given raw SQL string.
    fn new(input: &str) -> Parser<'_> {
        Parser { lexer: Lexer::new(input).peekable() }
    }

    /// Fetches the next lexer token, or errors if none is found.
    fn next(&mut self) -> Result<Token> {
        self.lexer.next().transpose()?.ok_or_else(|| errinput!("unexpected end of input"))
    }

    /// Returns the next identifier, or errors if not found.
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => errinput!("expected identifier, got {token}"),
        }
    }

    /// Returns the next lexer token if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().ok()?.filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Passes the next lexer token through the closure, consuming it if the
    /// closure returns Some. Returns the result of the closure.
    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        self.peek().ok()?.map(f)?.inspect(|_| drop(self.next()))
    }

    /// Returns the next keyword if there is one.
    fn next_if_keyword(&mut self) -> Option<Keyword> {
        self.next_if_map(|token| match token {
            Token::Keyword(keyword) => Some(*keyword),
            _ => None,
        })
    }

    /// Consumes the next lexer token if it is the given token, returning true.
    fn next_is(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    /// Consumes the next lexer token if it's the expected token, or errors.
    fn expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return errinput!("expected token {expect}, found {token}");
        }
        Ok(())
    }

    /// Consumes the next lexer token if it is the given token. Equivalent to
    /// next_is(), but expresses intent better.
    fn skip(&mut self, token: Token) {
        self.next_is(token);
    }

    /// Peeks the next lexer token if any, but transposes it for convenience.
    fn peek(&mut self) -> Result<Option<&Token>> {
        self.lexer.peek().map(|r| r.as_ref().map_err(|err| err.clone())).transpose()
    }

    /// Parses a SQL statement.
    fn parse_statement(&mut self) -> Result<ast::Statement> {
        let Some(token) = self.peek()? else {
            return errinput!("unexpected end of input");
        };
        match token {
            Token::Keyword(Keyword::Create) => self.parse_create_table(),
            Token::Keyword(Keyword::Delete) => self.parse_delete(),
            Token::Keyword(Keyword::Insert) => self.parse_insert(),
            Token::Keyword(Keyword::Select) => self.parse_select(),
            Token::Keyword(Keyword::Update) => self.parse_update(),
            token => errinput!("unexpected token {token}"),
        }
    }

    /// Parses a table name, optionally qualified by a database name.
    fn parse_table_name(&mut self) -> Result<ast::TableName> {
        let name = self.next_ident()?;
        if self.next_is(Token::Period) {
            return Ok(ast::TableName { database: Some(name), name: self.next_ident()? });
        }
        Ok(ast::TableName { database: None, name })
    }

    /// Parses a CREATE TABLE statement.
    fn parse_create_table(&mut self) -> Result<ast::Statement> {
        self.expect(Keyword::Create.into())?;
        self.expect(Keyword::Table.into())?;
        let name = self.next_ident()?;
        self.expect(Token::OpenParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_create_table_column()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;
        Ok(ast::Statement::CreateTable { name, columns })
    }

    /// Parses a CREATE TABLE column definition.
    fn parse_create_table_column(&mut self) -> Result<ast::Column> {
        let name = self.next_ident()?;
        let datatype = match self.next()? {
            Token::Keyword(Keyword::Bool | Keyword::Boolean) => DataType::Boolean,
            Token::Keyword(Keyword::Float | Keyword::Double) => DataType::Float,
            Token::Keyword(
                Keyword::Int
                | Keyword::Integer
                | Keyword::Bigint
                | Keyword::Smallint
                | Keyword::Tinyint,
            ) => DataType::Integer,
            Token::Keyword(
                Keyword::Char | Keyword::String | Keyword::Text | Keyword::Varchar,
            ) => DataType::String,
            token => return errinput!("unexpected token {token}"),
        };
        // Skip a display width or length, e.g. VARCHAR(255) or DOUBLE(10, 2).
        if self.next_is(Token::OpenParen) {
            loop {
                match self.next()? {
                    Token::Number(_) => {}
                    token => return errinput!("expected number, got {token}"),
                }
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
        }
        let mut column = ast::Column {
            name,
            datatype,
            primary_key: false,
            nullable: None,
            default: None,
            unique: false,
            auto_increment: false,
        };
        while let Some(keyword) = self.next_if_keyword() {
            match keyword {
                Keyword::Primary => {
                    self.expect(Keyword::Key.into())?;
                    column.primary_key = true;
                }
                Keyword::Null => {
                    if column.nullable.is_some() {
                        return errinput!("nullability already set for column {}", column.name);
                    }
                    column.nullable = Some(true)
                }
                Keyword::Not => {
                    self.expect(Keyword::Null.into())?;
                    if column.nullable.is_some() {
                        return errinput!("nullability already set for column {}", column.name);
                    }
                    column.nullable = Some(false)
                }
                // Parse above NOT's precedence, so DEFAULT 0 NOT NULL works.
                Keyword::Default => column.default = Some(self.parse_expression_at(5)?),
                Keyword::Unique => column.unique = true,
                Keyword::AutoIncrement => column.auto_increment = true,
                keyword => return errinput!("unexpected keyword {keyword}"),
            }
        }
        Ok(column)
    }

    /// Parses a DELETE statement.
    fn parse_delete(&mut self) -> Result<ast::Statement> {
        self.expect(Keyword::Delete.into())?;
        self.expect(Keyword::From.into())?;
        Ok(ast::Statement::Delete(ast::Delete {
            table: self.parse_table_name()?,
            r#where: self.parse_where_clause()?,
            order_by: self.parse_order_by_clause()?,
            limit: self.parse_limit_clause()?,
        }))
    }

    /// Parses an INSERT statement.
    fn parse_insert(&mut self) -> Result<ast::Statement> {
        self.expect(Keyword::Insert.into())?;
        self.expect(Keyword::Into.into())?;
        let table = self.parse_table_name()?;

        let mut columns = None;
        if self.next_is(Token::OpenParen) {
            let columns = columns.insert(Vec::new());
            loop {
                columns.push(self.next_ident()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
        }

        self.expect(Keyword::Values.into())?;

        let mut values = Vec::new();
        loop {
            let mut row = Vec::new();
            self.expect(Token::OpenParen)?;
            loop {
                row.push(self.parse_expression()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
            values.push(row);
            if !self.next_is(Token::Comma) {
                break;
            }
        }

        Ok(ast::Statement::Insert(ast::Insert { table, columns, values }))
    }

    /// Parses an UPDATE statement.
    fn parse_update(&mut self) -> Result<ast::Statement> {
        self.expect(Keyword::Update.into())?;
        let table = self.parse_table_name()?;
        self.expect(Keyword::Set.into())?;
        let mut set = IndexMap::new();
        loop {
            let column = self.next_ident()?;
            self.expect(Token::Equal)?;
            let expr = (!self.next_is(Keyword::Default.into()))
                .then(|| self.parse_expression())
                .transpose()?;
            if set.contains_key(&column) {
                return errinput!("column {column} set multiple times");
            }
            set.insert(column, expr);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(ast::Statement::Update(ast::Update {
            table,
            set,
            r#where: self.parse_where_clause()?,
            order_by: self.parse_order_by_clause()?,
            limit: self.parse_limit_clause()?,
        }))
    }

    /// Parses a SELECT statement.
    fn parse_select(&mut self) -> Result<ast::Statement> {
        let select = self.parse_select_clause()?;
        let from = self.parse_from_clause()?;
        let r#where = self.parse_where_clause()?;
        let order_by = self.parse_order_by_clause()?;
        let (mut limit, mut offset) = (None, None);
        if self.next_is(Keyword::Limit.into()) {
            let first = self.parse_expression()?;
            // MySQL's LIMIT offset, count form.
            if self.next_is(Token::Comma) {
                offset = Some(first);
                limit = Some(self.parse_expression()?);
            } else {
                limit = Some(first);
            }
        }
        if offset.is_none() && self.next_is(Keyword::Offset.into()) {
            offset = Some(self.parse_expression()?);
        }
        Ok(ast::Statement::Select(ast::Select { select, from, r#where, order_by, limit, offset }))
    }

    /// Parses a SELECT clause.
    fn parse_select_clause(&mut self) -> Result<Vec<(ast::Expression, Option<String>)>> {
        self.expect(Keyword::Select.into())?;
        let mut select = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let mut alias = None;
            if self.next_is(Keyword::As.into()) || matches!(self.peek()?, Some(Token::Ident(_))) {
                if expr == ast::Expression::All {
                    return errinput!("can't alias *");
                }
                alias = Some(self.next_ident()?);
            }
            select.push((expr, alias));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(select)
    }

    /// Parses a FROM clause, if present. Only a single table is supported.
    fn parse_from_clause(&mut self) -> Result<Option<(ast::TableName, Option<String>)>> {
        if !self.next_is(Keyword::From.into()) {
            return Ok(None);
        }
        let table = self.parse_table_name()?;
        let mut alias = None;
        if self.next_is(Keyword::As.into()) || matches!(self.peek()?, Some(Token::Ident(_))) {
            alias = Some(self.next_ident()?)
        };
        if self.next_is(Token::Comma) {
            return errinput!("selecting from multiple tables is not supported");
        }
        Ok(Some((table, alias)))
    }

    /// Parses a WHERE clause, if present.
    fn parse_where_clause(&mut self) -> Result<Option<ast::Expression>> {
        if !self.next_is(Keyword::Where.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses an ORDER BY clause, if present.
    fn parse_order_by_clause(&mut self) -> Result<Vec<(ast::Expression, ast::Direction)>> {
        if !self.next_is(Keyword::Order.into()) {
            return Ok(Vec::new());
        }
        let mut order_by = Vec::new();
        self.expect(Keyword::By.into())?;
        loop {
            let expr = self.parse_expression()?;
            let order = self
                .next_if_map(|token| match token {
                    Token::Keyword(Keyword::Asc) => Some(ast::Direction::Ascending),
                    Token::Keyword(Keyword::Desc) => Some(ast::Direction::Descending),
                    _ => None,
                })
                .unwrap_or_default();
            order_by.push((expr, order));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(order_by)
    }

    /// Parses a LIMIT clause, if present.
    fn parse_limit_clause(&mut self) -> Result<Option<ast::Expression>> {
        if !self.next_is(Keyword::Limit.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses an expression using the precedence climbing algorithm. See:
    ///
    /// <https://eli.thegreenplace.net/2012/08/02/parsing-expressions-by-precedence-climbing>
    ///
    /// Expressions are made up of atoms (values, columns, and parenthesized
    /// expressions) combined with prefix, infix, and postfix operators. The
    /// operator precedence, where 1 is the lowest, is:
    ///
    /// * 1: OR
    /// * 2: AND
    /// * 3: NOT
    /// * 4: =, !=, LIKE, IS, IN
    /// * 5: <, <=, >, >=
    /// * 6: +, -
    /// * 7: *, /, %
    /// * 8: +, - (prefix)
    ///
    /// Prefix operators are right-associative, all others are left-associative.
    /// Left-associative operators get a +1 to their precedence, so that they
    /// bind tighter to their left operand.
    ///
    /// The algorithm recursively parses the left-hand side of an expression
    /// (including any prefix operators), then repeatedly parses infix operators
    /// and their right-hand side, but only as long as their precedence is at
    /// least that of the upstack operator. Lower-precedence operators are left
    /// for the caller to apply.
    fn parse_expression(&mut self) -> Result<ast::Expression> {
        self.parse_expression_at(0)
    }

    /// Parses an expression at the given minimum precedence.
    fn parse_expression_at(&mut self, min_precedence: Precedence) -> Result<ast::Expression> {
        // If the left-hand side is a prefix operator, recursively parse it and
        // its operand. Otherwise, parse the left-hand side as an atom.
        let mut lhs = if let Some(prefix) = self.parse_prefix_operator_at(min_precedence) {
            let next_precedence = prefix.precedence() + prefix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            prefix.into_expression(rhs)
        } else {
            self.parse_expression_atom()?
        };

        // Apply any postfix operators to the left-hand side.
        while let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
            lhs = postfix.into_expression(lhs)
        }

        // Repeatedly apply any infix operators to the left-hand side as long as
        // their precedence is greater than or equal to the current minimum
        // precedence (i.e. that of the upstack operator).
        while let Some(infix) = self.parse_infix_operator_at(min_precedence) {
            let next_precedence = infix.precedence() + infix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            lhs = infix.into_expression(lhs, rhs);
        }

        // Apply any postfix operators after the binary operator. Consider e.g.
        // 1 + NULL IS NULL.
        while let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
            lhs = postfix.into_expression(lhs)
        }

        Ok(lhs)
    }

    /// Parses an expression atom. This is either:
    ///
    /// * A literal value.
    /// * A column name.
    /// * A parenthesized expression.
    fn parse_expression_atom(&mut self) -> Result<ast::Expression> {
        Ok(match self.next()? {
            // All columns.
            Token::Asterisk => ast::Expression::All,

            // Literal value.
            Token::Number(n) if n.chars().all(|c| c.is_ascii_digit()) => {
                ast::Literal::Integer(n.parse()?).into()
            }
            Token::Number(n) => ast::Literal::Float(n.parse()?).into(),
            Token::String(s) => ast::Literal::String(s).into(),
            Token::Keyword(Keyword::True) => ast::Literal::Boolean(true).into(),
            Token::Keyword(Keyword::False) => ast::Literal::Boolean(false).into(),
            Token::Keyword(Keyword::Null) => ast::Literal::Null.into(),

            // Function calls are not supported, but give a clear error.
            Token::Ident(name) if self.next_is(Token::OpenParen) => {
                return errinput!("unsupported function {name}");
            }

            // Column name, either qualified as table.column or unqualified.
            Token::Ident(table) if self.next_is(Token::Period) => {
                ast::Expression::Column(Some(table), self.next_ident()?)
            }
            Token::Ident(column) => ast::Expression::Column(None, column),

            // Parenthesized expression.
            Token::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::CloseParen)?;
                expr
            }

            token => return errinput!("expected expression atom, found {token}"),
        })
    }

    /// Parses a prefix operator, if there is one and its precedence is at least
    /// min_precedence.
    fn parse_prefix_operator_at(&mut self, min_precedence: Precedence) -> Option<PrefixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Keyword(Keyword::Not) => PrefixOperator::Not,
                Token::Minus => PrefixOperator::Minus,
                Token::Plus => PrefixOperator::Plus,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses an infix operator, if there is one and its precedence is at least
    /// min_precedence.
    fn parse_infix_operator_at(&mut self, min_precedence: Precedence) -> Option<InfixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Asterisk => InfixOperator::Multiply,
                Token::Equal => InfixOperator::Equal,
                Token::GreaterThan => InfixOperator::GreaterThan,
                Token::GreaterThanOrEqual => InfixOperator::GreaterThanOrEqual,
                Token::Keyword(Keyword::And) => InfixOperator::And,
                Token::Keyword(Keyword::Like) => InfixOperator::Like,
                Token::Keyword(Keyword::Or) => InfixOperator::Or,
                Token::LessOrGreaterThan => InfixOperator::NotEqual,
                Token::LessThan => InfixOperator::LessThan,
                Token::LessThanOrEqual => InfixOperator::LessThanOrEqual,
                Token::Minus => InfixOperator::Subtract,
                Token::NotEqual => InfixOperator::NotEqual,
                Token::Percent => InfixOperator::Remainder,
                Token::Plus => InfixOperator::Add,
                Token::Slash => InfixOperator::Divide,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses a postfix operator, if there is one and its precedence is at
    /// least min_precedence. These are all multi-token operators, some of
    /// which carry their own operands: IS [NOT] NULL, [NOT] IN (...), and
    /// NOT LIKE. They all share precedence 4.
    fn parse_postfix_operator_at(
        &mut self,
        min_precedence: Precedence,
    ) -> Result<Option<PostfixOperator>> {
        const PRECEDENCE: Precedence = 4;
        let Some(Token::Keyword(keyword @ (Keyword::Is | Keyword::In | Keyword::Not))) =
            self.peek()?.cloned()
        else {
            return Ok(None);
        };
        // We can't consume tokens unless the precedence is satisfied.
        if PRECEDENCE < min_precedence {
            return Ok(None);
        }
        self.next()?;

        let operator = match keyword {
            Keyword::Is => {
                let not = self.next_is(Keyword::Not.into());
                self.expect(Keyword::Null.into())?;
                match not {
                    false => PostfixOperator::IsNull,
                    true => PostfixOperator::IsNotNull,
                }
            }
            Keyword::In => PostfixOperator::In(self.parse_in_list()?),
            Keyword::Not => match self.next()? {
                Token::Keyword(Keyword::In) => PostfixOperator::NotIn(self.parse_in_list()?),
                Token::Keyword(Keyword::Like) => {
                    // LIKE is left-associative.
                    let pattern = self.parse_expression_at(PRECEDENCE + 1)?;
                    PostfixOperator::NotLike(pattern)
                }
                token => return errinput!("unexpected token {token}"),
            },
            _ => unreachable!("matched above"),
        };
        Ok(Some(operator))
    }

    /// Parses a parenthesized, non-empty list of expressions for IN.
    fn parse_in_list(&mut self) -> Result<Vec<ast::Expression>> {
        self.expect(Token::OpenParen)?;
        let mut list = Vec::new();
        loop {
            list.push(self.parse_expression()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;
        Ok(list)
    }
}

/// Operator precedence.
type Precedence = u8;

/// Operator associativity.
enum Associativity {
    Left,
    Right,
}

impl Add<Associativity> for Precedence {
    type Output = Self;

    fn add(self, rhs: Associativity) -> Self {
        // Left-associative operators have increased precedence, so they bind
        // tighter to their left-hand side.
        self + match rhs {
            Associativity::Left => 1,
            Associativity::Right => 0,
        }
    }
}

/// Prefix operators.
enum PrefixOperator {
    Minus, // -a
    Not,   // NOT a
    Plus,  // +a
}

impl PrefixOperator {
    /// The operator precedence.
    fn precedence(&self) -> Precedence {
        match self {
            Self::Not => 3,
            Self::Minus | Self::Plus => 8,
        }
    }

    // The operator associativity. Prefix operators are right-associative by
    // definition.
    fn associativity(&self) -> Associativity {
        Associativity::Right
    }

    /// Builds an AST expression for the operator.
    fn into_expression(self, rhs: ast::Expression) -> ast::Expression {
        let rhs = Box::new(rhs);
        match self {
            Self::Plus => ast::Operator::Identity(rhs).into(),
            Self::Minus => ast::Operator::Negate(rhs).into(),
            Self::Not => ast::Operator::Not(rhs).into(),
        }
    }
}

/// Infix operators.
enum InfixOperator {
    Add,                // a + b
    And,                // a AND b
    Divide,             // a / b
    Equal,              // a = b
    GreaterThan,        // a > b
    GreaterThanOrEqual, // a >= b
    LessThan,           // a < b
    LessThanOrEqual,    // a <= b
    Like,               // a LIKE b
    Multiply,           // a * b
    NotEqual,           // a != b
    Or,                 // a OR b
    Remainder,          // a % b
    Subtract,           // a - b
}

impl InfixOperator {
    /// The operator precedence.
    fn precedence(&self) -> Precedence {
        match self {
            Self::Or => 1,
            Self::And => 2,
            // Self::Not => 3
            Self::Equal | Self::NotEqual | Self::Like => 4, // also IS, IN
            Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => 5,
            Self::Add | Self::Subtract => 6,
            Self::Multiply | Self::Divide | Self::Remainder => 7,
        }
    }

    /// The operator associativity.
    fn associativity(&self) -> Associativity {
        Associativity::Left
    }

    /// Builds an AST expression for the infix operator.
    fn into_expression(self, lhs: ast::Expression, rhs: ast::Expression) -> ast::Expression {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            Self::Add => ast::Operator::Add(lhs, rhs).into(),
            Self::And => ast::Operator::And(lhs, rhs).into(),
            Self::Divide => ast::Operator::Divide(lhs, rhs).into(),
            Self::Equal => ast::Operator::Equal(lhs, rhs).into(),
            Self::GreaterThan => ast::Operator::GreaterThan(lhs, rhs).into(),
            Self::GreaterThanOrEqual => ast::Operator::GreaterThanOrEqual(lhs, rhs).into(),
            Self::LessThan => ast::Operator::LessThan(lhs, rhs).into(),
            Self::LessThanOrEqual => ast::Operator::LessThanOrEqual(lhs, rhs).into(),
            Self::Like => ast::Operator::Like(lhs, rhs).into(),
            Self::Multiply => ast::Operator::Multiply(lhs, rhs).into(),
            Self::NotEqual => ast::Operator::NotEqual(lhs, rhs).into(),
            Self::Or => ast::Operator::Or(lhs, rhs).into(),
            Self::Remainder => ast::Operator::Remainder(lhs, rhs).into(),
            Self::Subtract => ast::Operator::Subtract(lhs, rhs).into(),
        }
    }
}

/// Postfix operators.
enum PostfixOperator {
    IsNull,                       // a IS NULL
    IsNotNull,                    // a IS NOT NULL
    In(Vec<ast::Expression>),     // a IN (b, c)
    NotIn(Vec<ast::Expression>),  // a NOT IN (b, c)
    NotLike(ast::Expression),     // a NOT LIKE b
}

impl PostfixOperator {
    /// Builds an AST expression for the operator.
    fn into_expression(self, lhs: ast::Expression) -> ast::Expression {
        let lhs = Box::new(lhs);
        match self {
            Self::IsNull => ast::Operator::IsNull(lhs).into(),
            Self::IsNotNull => ast::Operator::Not(ast::Operator::IsNull(lhs).into()).into(),
            Self::In(list) => ast::Operator::In(lhs, list).into(),
            Self::NotIn(list) => ast::Operator::Not(ast::Operator::In(lhs, list).into()).into(),
            Self::NotLike(rhs) => {
                ast::Operator::Not(ast::Operator::Like(lhs, Box::new(rhs)).into()).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ast::{Expression, Literal, Operator};
    use pretty_assertions::assert_eq;

    fn col(name: &str) -> Box<Expression> {
        Box::new(Expression::Column(None, name.into()))
    }

    fn int(i: i64) -> Box<Expression> {
        Box::new(Literal::Integer(i).into())
    }

    /// Asserts that an expression parses to the expected SQL rendering, which
    /// makes the grouping explicit.
    macro_rules! test_expr {
        ( $( $name:ident: $input:literal => $expect:literal, )* ) => {
        $(
            #[test]
            fn $name() -> Result<()> {
                assert_eq!(Parser::parse_expr($input)?.to_string(), $expect);
                Ok(())
            }
        )*
        };
    }

    test_expr! {
        expr_precedence: "1 + 2 * 3 - 4" => "(1 + (2 * 3)) - 4",
        expr_left_assoc: "8 / 4 / 2" => "(8 / 4) / 2",
        expr_prefix: "-1 + +2" => "(-1) + (+2)",
        expr_logic: "a = 1 OR b = 2 AND NOT c" => "(a = 1) OR ((b = 2) AND (NOT c))",
        expr_compare: "a + 1 >= b * 2" => "(a + 1) >= (b * 2)",
        expr_is_null: "a IS NULL AND b IS NOT NULL" => "(a IS NULL) AND (NOT (b IS NULL))",
        expr_is_null_after_infix: "1 + NULL IS NULL" => "(1 + NULL) IS NULL",
        expr_in: "a IN (1, 2) OR a NOT IN ('x')" => "(a IN (1, 2)) OR (NOT (a IN ('x')))",
        expr_like: "name LIKE 'a%' AND name NOT LIKE '%z'" =>
            "(name LIKE 'a%') AND (NOT (name LIKE '%z'))",
        expr_not_in_precedence: "NOT a IN (1)" => "NOT (a IN (1))",
        expr_qualified: "users.id <> 3" => "users.id != 3",
        expr_literals: "TRUE AND FALSE OR NULL" => "(TRUE AND FALSE) OR NULL",
        expr_float: "1.5 * 2e1" => "1.5 * 20",
        expr_parens: "(1 + 2) * 3" => "(1 + 2) * 3",
    }

    #[test]
    fn select() -> Result<()> {
        let statement = Parser::parse(
            "SELECT id, name AS n, age + 1 older FROM db.users u WHERE id > 1 \
             ORDER BY n DESC, id LIMIT 10 OFFSET 5;",
        )?;
        assert_eq!(
            statement,
            ast::Statement::Select(ast::Select {
                select: vec![
                    (*col("id"), None),
                    (*col("name"), Some("n".into())),
                    (Operator::Add(col("age"), int(1)).into(), Some("older".into())),
                ],
                from: Some((
                    ast::TableName { database: Some("db".into()), name: "users".into() },
                    Some("u".into())
                )),
                r#where: Some(Operator::GreaterThan(col("id"), int(1)).into()),
                order_by: vec![
                    (*col("n"), ast::Direction::Descending),
                    (*col("id"), ast::Direction::Ascending),
                ],
                limit: Some(*int(10)),
                offset: Some(*int(5)),
            })
        );
        Ok(())
    }

    #[test]
    fn select_mysql_limit() -> Result<()> {
        let ast::Statement::Select(select) = Parser::parse("SELECT * FROM t LIMIT 5, 10")? else {
            panic!("expected select");
        };
        assert_eq!(select.select, vec![(Expression::All, None)]);
        assert_eq!(select.offset, Some(*int(5)));
        assert_eq!(select.limit, Some(*int(10)));
        Ok(())
    }

    #[test]
    fn insert() -> Result<()> {
        assert_eq!(
            Parser::parse("INSERT INTO t (a, b) VALUES (1, 'x'), (2, NULL)")?,
            ast::Statement::Insert(ast::Insert {
                table: ast::TableName { database: None, name: "t".into() },
                columns: Some(vec!["a".into(), "b".into()]),
                values: vec![
                    vec![*int(1), Literal::String("x".into()).into()],
                    vec![*int(2), Literal::Null.into()],
                ],
            })
        );
        Ok(())
    }

    #[test]
    fn update() -> Result<()> {
        let ast::Statement::Update(update) =
            Parser::parse("UPDATE t SET a = a + 1, b = DEFAULT WHERE a < 3 ORDER BY a LIMIT 1")?
        else {
            panic!("expected update");
        };
        assert_eq!(
            update.set.into_iter().collect::<Vec<_>>(),
            vec![
                ("a".to_string(), Some(Operator::Add(col("a"), int(1)).into())),
                ("b".to_string(), None),
            ]
        );
        assert_eq!(update.r#where, Some(Operator::LessThan(col("a"), int(3)).into()));
        assert_eq!(update.order_by, vec![(*col("a"), ast::Direction::Ascending)]);
        assert_eq!(update.limit, Some(*int(1)));
        Ok(())
    }

    #[test]
    fn delete() -> Result<()> {
        assert_eq!(
            Parser::parse("DELETE FROM t WHERE a = 1")?,
            ast::Statement::Delete(ast::Delete {
                table: ast::TableName { database: None, name: "t".into() },
                r#where: Some(Operator::Equal(col("a"), int(1)).into()),
                order_by: Vec::new(),
                limit: None,
            })
        );
        Ok(())
    }

    #[test]
    fn create_table() -> Result<()> {
        let ast::Statement::CreateTable { name, columns } = Parser::parse(
            "CREATE TABLE users (id BIGINT(20) PRIMARY KEY AUTO_INCREMENT, \
             name VARCHAR(255) NOT NULL, score DOUBLE DEFAULT 1.5 NOT NULL UNIQUE)",
        )?
        else {
            panic!("expected create table");
        };
        assert_eq!(name, "users");
        assert_eq!(columns.len(), 3);
        assert!(columns[0].primary_key && columns[0].auto_increment);
        assert_eq!(columns[0].datatype, DataType::Integer);
        assert_eq!(columns[1].nullable, Some(false));
        assert_eq!(columns[1].datatype, DataType::String);
        assert_eq!(columns[2].default, Some(Literal::Float(1.5).into()));
        assert_eq!(columns[2].nullable, Some(false));
        assert!(columns[2].unique);
        Ok(())
    }

    #[test]
    fn parse_many() -> Result<()> {
        let statements = Parser::parse_many(
            ";CREATE TABLE a (id INT PRIMARY KEY); CREATE TABLE b (id INT PRIMARY KEY);",
        )?;
        assert_eq!(statements.iter().map(|s| s.kind()).collect::<Vec<_>>(), ["CreateTable"; 2]);
        assert_eq!(Parser::parse_many("")?, Vec::new());
        assert!(Parser::parse_many("CREATE TABLE a (id INT) CREATE TABLE b (id INT)").is_err());
        Ok(())
    }

    macro_rules! test_error {
        ( $( $name:ident: $input:literal, )* ) => {
        $(
            #[test]
            fn $name() {
                let error = Parser::parse($input).expect_err("parse should fail");
                assert_eq!(error.kind(), ErrorKind::InvalidInput);
            }
        )*
        };
    }

    test_error! {
        error_empty: "",
        error_whitespace: "   ",
        error_dangling_from: "SELECT 1 FROM",
        error_trailing_token: "SELECT 1 2",
        error_unknown_statement: "EXPLAIN SELECT 1",
        error_function: "SELECT COUNT(*) FROM t",
        error_alias_all: "SELECT * AS x FROM t",
        error_multiple_tables: "SELECT * FROM a, b",
        error_update_twice: "UPDATE t SET a = 1, a = 2",
        error_is_not_value: "SELECT a IS 1",
        error_not_dangling: "SELECT a NOT 1",
        error_lexer: "SELECT 'open",
    }
}
