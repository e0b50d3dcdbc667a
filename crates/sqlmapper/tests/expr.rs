mod common;

use common::MockDriver;
use serde::Deserialize;
use sqlmapper::Placeholder;
use sqlmapper::prelude::*;
use std::sync::Arc;

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: i64,
    name: String,
}

fn user_row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", Value::from(id)), ("name", Value::from(name))])
}

#[tokio::test]
async fn named_dialect_compiles_to_positional() {
    let driver = MockDriver::new();
    let db = driver.database(Dialect::postgres());

    driver.push_rows(vec![user_row(1, "bob")]);
    let users: Vec<User> = db
        .select_expr(select("users").columns(["id", "name"]).filter(col("name").eq("bob")))
        .await
        .unwrap();
    assert_eq!(users, vec![User { id: 1, name: "bob".into() }]);

    let call = driver.last();
    assert_eq!(call.kind, "query");
    assert_eq!(call.sql, r#"SELECT "id", "name" FROM "users" WHERE "name" = $1"#);
    assert_eq!(call.args, vec![Value::from("bob")]);
}

#[tokio::test]
async fn positional_only_dialect_skips_named_pass() {
    let driver = MockDriver::new();
    let dialect = Dialect::new("positional")
        .supports_named(false)
        .named_prefix("")
        .placeholder(Placeholder::Dollar);
    let db = driver.database(Arc::new(dialect));

    let res = db
        .exec_expr(update("users").set("name", "eve").filter(col("id").eq(7)))
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 1);
    let call = driver.last();
    assert_eq!(call.kind, "exec");
    assert_eq!(call.sql, r#"UPDATE "users" SET "name" = $1 WHERE "id" = $2"#);
    assert_eq!(call.args, args!["eve", 7]);

    driver.push_rows(vec![user_row(7, "eve")]);
    let user: User = db
        .get_expr(select("users"), [col("id").eq(7)])
        .await
        .unwrap();
    assert_eq!(user.name, "eve");
    assert_eq!(driver.last().sql, r#"SELECT * FROM "users" WHERE "id" = $1"#);
    assert_eq!(driver.last().args, vec![Value::Int(7)]);
}
