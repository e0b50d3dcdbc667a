//! Generic client trait shared by connections and transactions.

use crate::dialect::Dialect;
use crate::driver::ExecResult;
use crate::error::{DbError, DbResult};
use crate::expr::{Compiler, Cond, Expr};
use crate::named::compile_named;
use crate::row::Row;
use crate::template::TemplateSet;
use crate::value::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

const LOG_SQL_MAX: usize = 200;

pub(crate) fn log_sql(kind: &'static str, sql: &str, args: usize) {
    if sql.len() > LOG_SQL_MAX {
        let mut end = LOG_SQL_MAX;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        tracing::debug!(target: "sqlmapper::sql", kind, sql = %&sql[..end], args, truncated = true);
    } else {
        tracing::debug!(target: "sqlmapper::sql", kind, sql = %sql, args);
    }
}

fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> DbResult<Vec<T>> {
    rows.iter().map(Row::decode).collect()
}

fn decode_first<T: DeserializeOwned>(rows: Vec<Row>) -> DbResult<T> {
    rows.first()
        .ok_or_else(|| DbError::not_found("Expected 1 row, got 0"))?
        .decode()
}

/// A trait that unifies database connections and transactions.
///
/// Implementors provide the raw positional calls; everything else renders
/// `.sql` templates, compiles named parameters or expressions and delegates
/// to them. Rendering happens before the returned future is first polled,
/// so no template lock is held across an await.
pub trait GenericClient: Send + Sync {
    fn dialect(&self) -> &Arc<Dialect>;

    fn templates(&self) -> &Arc<TemplateSet>;

    /// Run positional SQL as-is.
    fn execute_raw(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send;

    /// Query positional SQL as-is.
    fn query_raw(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<Vec<Row>>> + Send;

    /// Render a `.sql` template against `arg`; other input passes through.
    fn render<A: Serialize + ?Sized>(&self, sql_or_template: &str, arg: &A) -> DbResult<String> {
        let data = serde_json::to_value(arg)?;
        self.templates().render_sql(sql_or_template, &data)
    }

    /// Render, then rewrite named parameters into positional ones.
    fn compile<A: Serialize + ?Sized>(
        &self,
        sql_or_template: &str,
        arg: &A,
    ) -> DbResult<(String, Vec<Value>)> {
        let data = serde_json::to_value(arg)?;
        let sql = self.templates().render_sql(sql_or_template, &data)?;
        compile_named(self.dialect(), &sql, &data)
    }

    /// Execute with positional arguments. Templates see the argument list.
    fn exec(
        &self,
        sql_or_template: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send {
        let sql = self.render(sql_or_template, args);
        async move {
            let sql = sql?;
            log_sql("exec", &sql, args.len());
            self.execute_raw(&sql, args).await
        }
    }

    /// Execute with a named argument (struct or map).
    fn named_exec<A: Serialize + ?Sized>(
        &self,
        sql_or_template: &str,
        arg: &A,
    ) -> impl Future<Output = DbResult<ExecResult>> + Send {
        let compiled = self.compile(sql_or_template, arg);
        async move {
            let (sql, args) = compiled?;
            log_sql("named exec", &sql, args.len());
            self.execute_raw(&sql, &args).await
        }
    }

    /// Query with positional arguments.
    fn query(
        &self,
        sql_or_template: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<Vec<Row>>> + Send {
        let sql = self.render(sql_or_template, args);
        async move {
            let sql = sql?;
            log_sql("query", &sql, args.len());
            self.query_raw(&sql, args).await
        }
    }

    /// Query with a named argument.
    fn named_query<A: Serialize + ?Sized>(
        &self,
        sql_or_template: &str,
        arg: &A,
    ) -> impl Future<Output = DbResult<Vec<Row>>> + Send {
        let compiled = self.compile(sql_or_template, arg);
        async move {
            let (sql, args) = compiled?;
            log_sql("named query", &sql, args.len());
            self.query_raw(&sql, &args).await
        }
    }

    /// Query and decode every row.
    fn select<T: DeserializeOwned + Send>(
        &self,
        sql_or_template: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<Vec<T>>> + Send {
        let rows = self.query(sql_or_template, args);
        async move { decode_all(rows.await?) }
    }

    fn named_select<T: DeserializeOwned + Send, A: Serialize + ?Sized>(
        &self,
        sql_or_template: &str,
        arg: &A,
    ) -> impl Future<Output = DbResult<Vec<T>>> + Send {
        let rows = self.named_query(sql_or_template, arg);
        async move { decode_all(rows.await?) }
    }

    /// Query and decode the first row.
    ///
    /// - 0 rows: [`DbError::NotFound`]
    /// - more rows: the first one
    fn get<T: DeserializeOwned + Send>(
        &self,
        sql_or_template: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<T>> + Send {
        let rows = self.query(sql_or_template, args);
        async move { decode_first(rows.await?) }
    }

    fn named_get<T: DeserializeOwned + Send, A: Serialize + ?Sized>(
        &self,
        sql_or_template: &str,
        arg: &A,
    ) -> impl Future<Output = DbResult<T>> + Send {
        let rows = self.named_query(sql_or_template, arg);
        async move { decode_first(rows.await?) }
    }

    /// Compile a SELECT expression and decode every row.
    fn select_expr<T: DeserializeOwned + Send>(
        &self,
        expr: impl Into<Expr>,
    ) -> impl Future<Output = DbResult<Vec<T>>> + Send {
        let compiled = Compiler::new(self.dialect()).compile(&expr.into());
        async move {
            let (sql, args) = compiled?;
            log_sql("select expr", &sql, args.len());
            decode_all(self.query_raw(&sql, &args).await?)
        }
    }

    /// Compile and execute an INSERT / UPDATE / DELETE expression.
    fn exec_expr(&self, expr: impl Into<Expr>) -> impl Future<Output = DbResult<ExecResult>> + Send {
        let compiled = Compiler::new(self.dialect()).compile(&expr.into());
        async move {
            let (sql, args) = compiled?;
            log_sql("exec expr", &sql, args.len());
            self.execute_raw(&sql, &args).await
        }
    }

    /// AND `filters` into the expression, then decode the first row.
    fn get_expr<T: DeserializeOwned + Send>(
        &self,
        expr: impl Into<Expr>,
        filters: impl IntoIterator<Item = Cond>,
    ) -> impl Future<Output = DbResult<T>> + Send {
        let mut expr = expr.into();
        for filter in filters {
            expr.and_filter(filter);
        }
        let compiled = Compiler::new(self.dialect()).compile(&expr);
        async move {
            let (sql, args) = compiled?;
            log_sql("get expr", &sql, args.len());
            decode_first(self.query_raw(&sql, &args).await?)
        }
    }
}
