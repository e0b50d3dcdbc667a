//! Structured SQL expressions.
//!
//! ```ignore
//! use sqlmapper::expr::{col, select};
//!
//! let expr = select("users")
//!     .columns(["id", "name"])
//!     .filter(col("status").eq("active").and(col("age").gte(18)))
//!     .order_by_desc("created_at")
//!     .limit(10);
//! let (sql, args) = Compiler::new(&dialect).build(&expr.into())?;
//! ```
//!
//! Compilation is dialect-aware: identifiers are quoted, placeholders follow
//! the dialect style and paging uses `LIMIT/OFFSET` or `OFFSET ... FETCH`.

mod compile;

pub use compile::Compiler;

use crate::value::Value;

/// Comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl CmpOp {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Like => "LIKE",
            CmpOp::NotLike => "NOT LIKE",
        }
    }
}

/// Boolean condition tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Cond {
    Cmp {
        column: String,
        op: CmpOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
    /// Raw SQL fragment without parameters.
    Raw(String),
}

impl Cond {
    pub fn and(self, other: Cond) -> Cond {
        match self {
            Cond::And(mut items) => {
                items.push(other);
                Cond::And(items)
            }
            first => Cond::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Cond) -> Cond {
        match self {
            Cond::Or(mut items) => {
                items.push(other);
                Cond::Or(items)
            }
            first => Cond::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Cond {
        Cond::Not(Box::new(self))
    }

    pub fn raw(sql: impl Into<String>) -> Cond {
        Cond::Raw(sql.into())
    }
}

/// Column reference used to start a condition: `col("age").gt(18)`.
#[derive(Clone, Debug)]
pub struct ColumnRef(String);

/// Start a condition on `name`.
pub fn col(name: impl Into<String>) -> ColumnRef {
    ColumnRef(name.into())
}

impl ColumnRef {
    fn cmp(self, op: CmpOp, value: impl Into<Value>) -> Cond {
        Cond::Cmp {
            column: self.0,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Lte, value)
    }

    pub fn like(self, pattern: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::Like, pattern)
    }

    pub fn not_like(self, pattern: impl Into<Value>) -> Cond {
        self.cmp(CmpOp::NotLike, pattern)
    }

    pub fn in_list<T: Into<Value>>(self, values: impl IntoIterator<Item = T>) -> Cond {
        Cond::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<T: Into<Value>>(self, values: impl IntoIterator<Item = T>) -> Cond {
        Cond::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(self) -> Cond {
        Cond::Null {
            column: self.0,
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Cond {
        Cond::Null {
            column: self.0,
            negated: true,
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

fn push_filter(slot: &mut Option<Cond>, cond: Cond) {
    *slot = Some(match slot.take() {
        Some(existing) => existing.and(cond),
        None => cond,
    });
}

#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) filter: Option<Cond>,
    pub(crate) order: Vec<(String, Order)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

/// `SELECT ... FROM table`
pub fn select(table: impl Into<String>) -> Select {
    Select {
        table: table.into(),
        columns: Vec::new(),
        filter: None,
        order: Vec::new(),
        limit: None,
        offset: None,
    }
}

impl Select {
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// AND a condition into the WHERE clause.
    pub fn filter(mut self, cond: Cond) -> Self {
        push_filter(&mut self.filter, cond);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn order_by_asc(self, column: impl Into<String>) -> Self {
        self.order_by(column, Order::Asc)
    }

    pub fn order_by_desc(self, column: impl Into<String>) -> Self {
        self.order_by(column, Order::Desc)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    pub(crate) table: String,
    pub(crate) values: Vec<(String, Value)>,
}

/// `INSERT INTO table`
pub fn insert(table: impl Into<String>) -> Insert {
    Insert {
        table: table.into(),
        values: Vec::new(),
    }
}

impl Insert {
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub(crate) table: String,
    pub(crate) sets: Vec<(String, Value)>,
    pub(crate) filter: Option<Cond>,
}

/// `UPDATE table`
pub fn update(table: impl Into<String>) -> Update {
    Update {
        table: table.into(),
        sets: Vec::new(),
        filter: None,
    }
}

impl Update {
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push((column.into(), value.into()));
        self
    }

    pub fn filter(mut self, cond: Cond) -> Self {
        push_filter(&mut self.filter, cond);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delete {
    pub(crate) table: String,
    pub(crate) filter: Option<Cond>,
}

/// `DELETE FROM table`
pub fn delete(table: impl Into<String>) -> Delete {
    Delete {
        table: table.into(),
        filter: None,
    }
}

impl Delete {
    pub fn filter(mut self, cond: Cond) -> Self {
        push_filter(&mut self.filter, cond);
        self
    }
}

/// Any compilable statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Expr {
    /// AND an extra condition into the statement's WHERE clause.
    ///
    /// INSERT has no WHERE clause; the condition is ignored there.
    pub fn and_filter(&mut self, cond: Cond) {
        match self {
            Expr::Select(s) => push_filter(&mut s.filter, cond),
            Expr::Update(u) => push_filter(&mut u.filter, cond),
            Expr::Delete(d) => push_filter(&mut d.filter, cond),
            Expr::Insert(_) => {}
        }
    }
}

impl From<Select> for Expr {
    fn from(value: Select) -> Self {
        Expr::Select(value)
    }
}

impl From<Insert> for Expr {
    fn from(value: Insert) -> Self {
        Expr::Insert(value)
    }
}

impl From<Update> for Expr {
    fn from(value: Update) -> Self {
        Expr::Update(value)
    }
}

impl From<Delete> for Expr {
    fn from(value: Delete) -> Self {
        Expr::Delete(value)
    }
}

#[cfg(test)]
mod tests;
