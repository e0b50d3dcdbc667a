//! Dialect-aware SQL fragment rendering.
//!
//! Two layers:
//! - [`value`]: scalar / list literals (the injection boundary)
//! - [`predicate`]: WHERE clauses, column lists, assignment lists, ORDER BY
//!
//! Template helpers and the expression compiler both build on these.

pub mod predicate;
pub mod value;

pub use predicate::{
    Column, WhereArg, all_columns, args, columns, is_zero, named_where_clause, order_by,
    render_where, set_args, where_clause,
};
pub use value::{escape, render_value, render_values};
