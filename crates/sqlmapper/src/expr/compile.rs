use super::{Cond, Delete, Expr, Insert, Order, Select, Update};
use crate::dialect::{Dialect, LimitStyle};
use crate::error::{DbError, DbResult};
use crate::named::compile_named_values;
use crate::value::Value;
use std::collections::BTreeMap;

/// Compiles [`Expr`] trees for one dialect.
#[derive(Clone, Copy, Debug)]
pub struct Compiler<'d> {
    dialect: &'d Dialect,
}

struct Buffer<'d> {
    dialect: &'d Dialect,
    sql: String,
    args: Vec<Value>,
    named: bool,
}

impl<'d> Buffer<'d> {
    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn keyword(&mut self, keyword: &str) {
        let spelled = self.dialect.keyword(keyword).to_string();
        self.sql.push_str(&spelled);
    }

    /// Quote `schema.table` part by part; `*` stays bare.
    fn ident(&mut self, name: &str) {
        for (idx, part) in name.split('.').enumerate() {
            if idx > 0 {
                self.sql.push('.');
            }
            if part == "*" {
                self.sql.push('*');
            } else {
                let quoted = self.dialect.quote_identifier(part);
                self.sql.push_str(&quoted);
            }
        }
    }

    fn bind(&mut self, value: &Value) {
        self.args.push(value.clone());
        let n = self.args.len();
        if self.named {
            let placeholder = format!("{}p{}", self.dialect.prefix(), n);
            self.sql.push_str(&placeholder);
        } else {
            let placeholder = self.dialect.placeholder_at(n);
            self.sql.push_str(&placeholder);
        }
    }

    fn cond(&mut self, cond: &Cond) {
        match cond {
            Cond::Cmp { column, op, value } => {
                self.ident(column);
                self.push(" ");
                self.keyword(op.keyword());
                self.push(" ");
                self.bind(value);
            }
            Cond::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() && *negated {
                    self.push("1=1");
                    return;
                }
                self.ident(column);
                self.push(" ");
                self.keyword(if *negated { "NOT IN" } else { "IN" });
                self.push(" (");
                if values.is_empty() {
                    self.keyword("NULL");
                }
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.bind(value);
                }
                self.push(")");
            }
            Cond::Null { column, negated } => {
                self.ident(column);
                self.push(" ");
                self.keyword(if *negated { "IS NOT NULL" } else { "IS NULL" });
            }
            Cond::And(items) => self.group(items, "AND", "1=1"),
            Cond::Or(items) => self.group(items, "OR", "1=0"),
            Cond::Not(inner) => {
                self.keyword("NOT");
                self.push(" (");
                self.cond(inner);
                self.push(")");
            }
            Cond::Raw(sql) => self.push(sql),
        }
    }

    fn group(&mut self, items: &[Cond], joiner: &str, empty: &str) {
        match items {
            [] => self.push(empty),
            [single] => self.cond(single),
            _ => {
                self.push("(");
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        self.push(" ");
                        self.keyword(joiner);
                        self.push(" ");
                    }
                    self.cond(item);
                }
                self.push(")");
            }
        }
    }

    fn filter(&mut self, filter: &Option<Cond>) {
        if let Some(cond) = filter {
            self.push(" ");
            self.keyword("WHERE");
            self.push(" ");
            self.cond(cond);
        }
    }

    fn select(&mut self, s: &Select) {
        self.keyword("SELECT");
        self.push(" ");
        if s.columns.is_empty() {
            self.push("*");
        }
        for (idx, column) in s.columns.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.ident(column);
        }
        self.push(" ");
        self.keyword("FROM");
        self.push(" ");
        self.ident(&s.table);
        self.filter(&s.filter);

        let paged = s.limit.is_some() || s.offset.is_some();
        let fetch = self.dialect.paging() == LimitStyle::OffsetFetch;

        if !s.order.is_empty() {
            self.push(" ");
            self.keyword("ORDER BY");
            self.push(" ");
            for (idx, (column, order)) in s.order.iter().enumerate() {
                if idx > 0 {
                    self.push(", ");
                }
                self.ident(column);
                self.push(" ");
                self.keyword(match order {
                    Order::Asc => "ASC",
                    Order::Desc => "DESC",
                });
            }
        } else if paged && fetch {
            // OFFSET/FETCH is only valid after ORDER BY.
            self.push(" ");
            self.keyword("ORDER BY");
            self.push(" (SELECT NULL)");
        }

        if fetch {
            if paged {
                let offset = s.offset.unwrap_or(0);
                self.push(&format!(" OFFSET {offset} ROWS"));
                if let Some(limit) = s.limit {
                    self.push(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                }
            }
        } else {
            if let Some(limit) = s.limit {
                self.push(" ");
                self.keyword("LIMIT");
                self.push(&format!(" {limit}"));
            }
            if let Some(offset) = s.offset {
                self.push(" ");
                self.keyword("OFFSET");
                self.push(&format!(" {offset}"));
            }
        }
    }

    fn insert(&mut self, i: &Insert) -> DbResult<()> {
        if i.values.is_empty() {
            return Err(DbError::Validation(format!(
                "INSERT INTO {} requires at least one value",
                i.table
            )));
        }
        self.keyword("INSERT INTO");
        self.push(" ");
        self.ident(&i.table);
        self.push(" (");
        for (idx, (column, _)) in i.values.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.ident(column);
        }
        self.push(") ");
        self.keyword("VALUES");
        self.push(" (");
        for (idx, (_, value)) in i.values.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.bind(value);
        }
        self.push(")");
        Ok(())
    }

    fn update(&mut self, u: &Update) -> DbResult<()> {
        if u.sets.is_empty() {
            return Err(DbError::Validation(format!(
                "UPDATE {} requires at least one SET",
                u.table
            )));
        }
        self.keyword("UPDATE");
        self.push(" ");
        self.ident(&u.table);
        self.push(" ");
        self.keyword("SET");
        self.push(" ");
        for (idx, (column, value)) in u.sets.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.ident(column);
            self.push(" = ");
            self.bind(value);
        }
        self.filter(&u.filter);
        Ok(())
    }

    fn delete(&mut self, d: &Delete) {
        self.keyword("DELETE FROM");
        self.push(" ");
        self.ident(&d.table);
        self.filter(&d.filter);
    }

    fn expr(&mut self, expr: &Expr) -> DbResult<()> {
        match expr {
            Expr::Select(s) => self.select(s),
            Expr::Insert(i) => self.insert(i)?,
            Expr::Update(u) => self.update(u)?,
            Expr::Delete(d) => self.delete(d),
        }
        Ok(())
    }
}

impl<'d> Compiler<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self { dialect }
    }

    fn run(&self, expr: &Expr, named: bool) -> DbResult<(String, Vec<Value>)> {
        let mut buf = Buffer {
            dialect: self.dialect,
            sql: String::with_capacity(128),
            args: Vec::new(),
            named,
        };
        buf.expr(expr)?;
        Ok((buf.sql, buf.args))
    }

    /// SQL with positional placeholders plus arguments in order.
    pub fn build(&self, expr: &Expr) -> DbResult<(String, Vec<Value>)> {
        self.run(expr, false)
    }

    /// SQL with `<prefix>p1`, `<prefix>p2`, ... placeholders plus the
    /// name → value map (names without the prefix).
    pub fn build_named(&self, expr: &Expr) -> DbResult<(String, BTreeMap<String, Value>)> {
        let (sql, args) = self.run(expr, true)?;
        let named = args
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (format!("p{}", idx + 1), value))
            .collect();
        Ok((sql, named))
    }

    /// Executable SQL and arguments.
    ///
    /// Dialects that support named parameters go through [`Self::build_named`]
    /// and the named-parameter pass; the others use [`Self::build`] directly.
    pub fn compile(&self, expr: &Expr) -> DbResult<(String, Vec<Value>)> {
        if self.dialect.is_named_supported() {
            let (sql, args) = self.build_named(expr)?;
            compile_named_values(self.dialect, &sql, &args)
        } else {
            self.build(expr)
        }
    }
}
