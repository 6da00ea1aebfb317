use indexmap::IndexMap;
use itertools::Itertools as _;

use super::format_ident;
use crate::sql::types::{DataType, Value};

/// The statement is the root node of the Abstract Syntax Tree, and describes
/// the syntactic structure of a SQL query. It is built from a raw SQL string by
/// the parser, and executed by the statement processor.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// CREATE TABLE: creates a new table. Only used to load schemas.
    CreateTable { name: String, columns: Vec<Column> },
    /// DELETE: deletes rows from a table.
    Delete(Delete),
    /// INSERT INTO: inserts new rows into a table.
    Insert(Insert),
    /// SELECT: selects rows, optionally from a table.
    Select(Select),
    /// UPDATE: updates rows in a table.
    Update(Update),
}

impl Statement {
    /// Returns the name of the statement type, e.g. for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "CreateTable",
            Self::Delete(_) => "Delete",
            Self::Insert(_) => "Insert",
            Self::Select(_) => "Select",
            Self::Update(_) => "Update",
        }
    }
}

/// A table name, optionally qualified by a database name.
#[derive(Clone, Debug, PartialEq)]
pub struct TableName {
    pub database: Option<String>,
    pub name: String,
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(database) = &self.database {
            write!(f, "{}.", format_ident(database))?;
        }
        f.write_str(&format_ident(&self.name))
    }
}

/// A SELECT statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    /// Expressions to select, with an optional column alias.
    pub select: Vec<(Expression, Option<String>)>,
    /// The table to select from, with an optional alias. If None, a single
    /// empty row is selected from.
    pub from: Option<(TableName, Option<String>)>,
    /// WHERE: optional condition to filter rows.
    pub r#where: Option<Expression>,
    /// ORDER BY: expressions to sort by, with direction.
    pub order_by: Vec<(Expression, Direction)>,
    /// LIMIT: maximum number of rows to return.
    pub limit: Option<Expression>,
    /// OFFSET: number of rows to skip.
    pub offset: Option<Expression>,
}

/// An INSERT statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    pub table: TableName,
    /// Columns to insert values into. If None, all columns in schema order.
    pub columns: Option<Vec<String>>,
    /// Row values to insert.
    pub values: Vec<Vec<Expression>>,
}

/// An UPDATE statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub table: TableName,
    /// Columns to set, in query order. None means DEFAULT.
    pub set: IndexMap<String, Option<Expression>>,
    pub r#where: Option<Expression>,
    pub order_by: Vec<(Expression, Direction)>,
    pub limit: Option<Expression>,
}

/// A DELETE statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Delete {
    pub table: TableName,
    pub r#where: Option<Expression>,
    pub order_by: Vec<(Expression, Direction)>,
    pub limit: Option<Expression>,
}

/// A CREATE TABLE column definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub primary_key: bool,
    pub nullable: Option<bool>,
    pub default: Option<Expression>,
    pub unique: bool,
    pub auto_increment: bool,
}

/// ORDER BY direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// SQL expressions, e.g. `a + 7 > b`. Can be nested.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// All columns, i.e. *.
    All,
    /// A column reference, optionally qualified with a table name.
    Column(Option<String>, String),
    /// A literal value.
    Literal(Literal),
    /// An operator.
    Operator(Operator),
}

/// Expression literal values.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Expression operators.
///
/// Since this is a recursive data structure, we have to box each child
/// expression, which incurs a heap allocation. There are clever ways to get
/// around this, but we keep it simple.
#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
    And(Box<Expression>, Box<Expression>), // a AND b
    Not(Box<Expression>),                  // NOT a
    Or(Box<Expression>, Box<Expression>),  // a OR b

    Equal(Box<Expression>, Box<Expression>),              // a = b
    GreaterThan(Box<Expression>, Box<Expression>),        // a > b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>), // a >= b
    In(Box<Expression>, Vec<Expression>),                 // a IN (b, c)
    IsNull(Box<Expression>),                              // a IS NULL
    LessThan(Box<Expression>, Box<Expression>),           // a < b
    LessThanOrEqual(Box<Expression>, Box<Expression>),    // a <= b
    NotEqual(Box<Expression>, Box<Expression>),           // a != b

    Add(Box<Expression>, Box<Expression>),       // a + b
    Divide(Box<Expression>, Box<Expression>),    // a / b
    Identity(Box<Expression>),                   // +a
    Multiply(Box<Expression>, Box<Expression>),  // a * b
    Negate(Box<Expression>),                     // -a
    Remainder(Box<Expression>, Box<Expression>), // a % b
    Subtract(Box<Expression>, Box<Expression>),  // a - b

    Like(Box<Expression>, Box<Expression>), // a LIKE b
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Operator> for Expression {
    fn from(operator: Operator) -> Self {
        Self::Operator(operator)
    }
}

impl From<Operator> for Box<Expression> {
    fn from(operator: Operator) -> Self {
        Box::new(operator.into())
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(b),
            Literal::Integer(i) => Value::Integer(i),
            Literal::Float(f) => Value::Float(f),
            Literal::String(s) => Value::String(s),
        }
    }
}

/// Formats the expression as SQL. This is used as the column label of
/// unaliased SELECT expressions. Nested operators are parenthesized, so the
/// output does not depend on operator precedence.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Operator::*;

        // Formats an operand, parenthesizing nested operators.
        fn operand(expr: &Expression) -> String {
            match expr {
                Expression::Operator(_) => format!("({expr})"),
                expr => expr.to_string(),
            }
        }

        match self {
            Self::All => f.write_str("*"),
            Self::Column(Some(table), column) => {
                write!(f, "{}.{}", format_ident(table), format_ident(column))
            }
            Self::Column(None, column) => f.write_str(&format_ident(column)),
            Self::Literal(literal) => f.write_str(&Value::from(literal.clone()).to_sql()),
            Self::Operator(operator) => match operator {
                Not(expr) => write!(f, "NOT {}", operand(expr)),
                Identity(expr) => write!(f, "+{}", operand(expr)),
                Negate(expr) => write!(f, "-{}", operand(expr)),
                IsNull(expr) => write!(f, "{} IS NULL", operand(expr)),
                In(expr, list) => {
                    write!(f, "{} IN ({})", operand(expr), list.iter().map(operand).join(", "))
                }
                And(lhs, rhs)
                | Or(lhs, rhs)
                | Equal(lhs, rhs)
                | GreaterThan(lhs, rhs)
                | GreaterThanOrEqual(lhs, rhs)
                | LessThan(lhs, rhs)
                | LessThanOrEqual(lhs, rhs)
                | NotEqual(lhs, rhs)
                | Add(lhs, rhs)
                | Divide(lhs, rhs)
                | Multiply(lhs, rhs)
                | Remainder(lhs, rhs)
                | Subtract(lhs, rhs)
                | Like(lhs, rhs) => {
                    let symbol = match operator {
                        And(..) => "AND",
                        Or(..) => "OR",
                        Equal(..) => "=",
                        GreaterThan(..) => ">",
                        GreaterThanOrEqual(..) => ">=",
                        LessThan(..) => "<",
                        LessThanOrEqual(..) => "<=",
                        NotEqual(..) => "!=",
                        Add(..) => "+",
                        Divide(..) => "/",
                        Multiply(..) => "*",
                        Remainder(..) => "%",
                        Subtract(..) => "-",
                        Like(..) => "LIKE",
                        Not(_) | Identity(_) | Negate(_) | IsNull(_) | In(..) => unreachable!(),
                    };
                    write!(f, "{} {symbol} {}", operand(lhs), operand(rhs))
                }
            },
        }
    }
}
