//! Dialect-bound Handlebars helpers.
//!
//! | helper | output |
//! |---|---|
//! | `where` / `mapWhere` | ` WHERE a=1 AND b LIKE 'x%' ` |
//! | `namedWhere` / `nwhere` / `namedMapWhere` | ` WHERE a=:a AND b=:b ` |
//! | `recordWhere` / `namedRecordWhere` | same, zero values skipped |
//! | `v` | one literal |
//! | `list` | comma-joined literals |
//! | `n` / `sqlName` | quoted identifier |
//! | `columns` / `allColumns` / `args` / `setArgs` | column-list fragments |
//! | `orderBy` | ` ORDER BY a ASC,b DESC ` |
//! | `driver` / `dialect` | dialect name |
//!
//! Objects reach templates as JSON maps, so the plain WHERE helpers emit
//! every entry with sorted keys and LIKE on wildcard text. The `record`
//! variants keep declaration order and drop zero-valued fields. All of them
//! accept `join="OR"`.

use crate::dialect::Dialect;
use crate::render::{self, Column, WhereArg};
use crate::value::Value;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
};
use serde_json::Value as Json;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
enum Kind {
    Where { named: bool, map: bool },
    Value,
    List,
    SqlName,
    Columns,
    AllColumns,
    Args,
    SetArgs,
    OrderBy,
    DialectName,
}

const HELPERS: &[(&str, Kind)] = &[
    ("where", Kind::Where { named: false, map: true }),
    ("namedWhere", Kind::Where { named: true, map: true }),
    ("nwhere", Kind::Where { named: true, map: true }),
    ("mapWhere", Kind::Where { named: false, map: true }),
    ("namedMapWhere", Kind::Where { named: true, map: true }),
    ("recordWhere", Kind::Where { named: false, map: false }),
    ("namedRecordWhere", Kind::Where { named: true, map: false }),
    ("v", Kind::Value),
    ("list", Kind::List),
    ("n", Kind::SqlName),
    ("sqlName", Kind::SqlName),
    ("columns", Kind::Columns),
    ("allColumns", Kind::AllColumns),
    ("args", Kind::Args),
    ("setArgs", Kind::SetArgs),
    ("orderBy", Kind::OrderBy),
    ("driver", Kind::DialectName),
    ("dialect", Kind::DialectName),
];

/// Register every SQL helper on `registry`, bound to `dialect`.
pub(crate) fn register_all(registry: &mut Handlebars<'static>, dialect: &Arc<Dialect>) {
    for (name, kind) in HELPERS {
        registry.register_helper(
            name,
            Box::new(SqlHelper {
                name: *name,
                kind: *kind,
                dialect: dialect.clone(),
            }),
        );
    }
}

/// Names of the registered helpers.
pub fn helper_names() -> impl Iterator<Item = &'static str> {
    HELPERS.iter().map(|(name, _)| *name)
}

struct SqlHelper {
    name: &'static str,
    kind: Kind,
    dialect: Arc<Dialect>,
}

fn param<'a>(h: &'a Helper<'_, '_>, name: &str) -> Result<&'a Json, RenderError> {
    h.param(0)
        .map(|p| p.value())
        .ok_or_else(|| RenderError::new(format!("{name} helper requires a parameter")))
}

fn column_list(value: &Json, name: &str) -> Result<Vec<Column>, RenderError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| RenderError::new(format!("{name} helper expects a column list: {e}")))
}

fn order_pairs(value: &Json, name: &str) -> Result<Vec<(String, String)>, RenderError> {
    let pair = |item: &Json| -> Result<(String, String), RenderError> {
        match item {
            Json::String(column) => Ok((column.clone(), "ASC".to_string())),
            Json::Array(parts) => match parts.as_slice() {
                [Json::String(column)] => Ok((column.clone(), "ASC".to_string())),
                [Json::String(column), Json::String(dir)] => Ok((column.clone(), dir.clone())),
                _ => Err(RenderError::new(format!(
                    "{name} helper expects [column, direction] pairs"
                ))),
            },
            other => Err(RenderError::new(format!(
                "{name} helper: unsupported entry {other}"
            ))),
        }
    };

    match value {
        Json::Null => Ok(Vec::new()),
        Json::Object(map) => Ok(map
            .iter()
            .map(|(column, dir)| {
                let dir = dir.as_str().unwrap_or("ASC").to_string();
                (column.clone(), dir)
            })
            .collect()),
        Json::Array(items) => items.iter().map(pair).collect(),
        other => Err(RenderError::new(format!(
            "{name} helper expects an object or array, got {other}"
        ))),
    }
}

impl SqlHelper {
    fn render(&self, h: &Helper<'_, '_>) -> Result<String, RenderError> {
        let d = self.dialect.as_ref();
        let text = match self.kind {
            Kind::Where { named, map } => {
                let join = match h.hash_get("join").and_then(|v| v.value().as_str()) {
                    Some(join) if join.eq_ignore_ascii_case("or") => "OR",
                    _ => "AND",
                };
                match h.param(0).map(|p| p.value()) {
                    None | Some(Json::Null) => String::new(),
                    Some(Json::Object(obj)) => {
                        let arg = if map {
                            WhereArg::Map(obj)
                        } else {
                            WhereArg::Record(obj)
                        };
                        render::render_where(d, arg, join, named).map_err(|e| {
                            RenderError::new(format!("{} helper: {e}", self.name))
                        })?
                    }
                    Some(other) => {
                        return Err(RenderError::new(format!(
                            "{} helper expects an object, got {other}",
                            self.name
                        )));
                    }
                }
            }
            Kind::Value => render::render_value(d, &Value::from(param(h, self.name)?)),
            Kind::List => render::render_values(d, &Value::from(param(h, self.name)?)),
            Kind::SqlName => match param(h, self.name)? {
                Json::String(s) => d.quote_identifier(s),
                other => d.quote_identifier(&other.to_string()),
            },
            Kind::Columns => render::columns(d, &column_list(param(h, self.name)?, self.name)?),
            Kind::AllColumns => {
                render::all_columns(d, &column_list(param(h, self.name)?, self.name)?)
            }
            Kind::Args => render::args(d, &column_list(param(h, self.name)?, self.name)?),
            Kind::SetArgs => render::set_args(d, &column_list(param(h, self.name)?, self.name)?),
            Kind::OrderBy => {
                let pairs = match h.param(0) {
                    Some(p) => order_pairs(p.value(), self.name)?,
                    None => Vec::new(),
                };
                render::order_by(d, &pairs)
            }
            Kind::DialectName => d.name().to_string(),
        };
        Ok(text)
    }
}

impl HelperDef for SqlHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let text = self.render(h)?;
        out.write(&text)?;
        Ok(())
    }
}
