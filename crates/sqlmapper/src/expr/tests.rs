use super::*;
use crate::dialect::Dialect;
use crate::error::DbError;
use crate::value::Value;

fn build(dialect: &Dialect, expr: impl Into<Expr>) -> (String, Vec<Value>) {
    Compiler::new(dialect).build(&expr.into()).unwrap()
}

#[test]
fn test_select_basic() {
    let (sql, args) = build(&Dialect::mysql(), select("users"));
    assert_eq!(sql, "SELECT * FROM `users`");
    assert!(args.is_empty());
}

#[test]
fn test_select_with_conditions_postgres() {
    let expr = select("users")
        .columns(["id", "name"])
        .filter(col("status").eq("active"))
        .filter(col("age").gt(18))
        .order_by_desc("created_at")
        .limit(10)
        .offset(20);
    let (sql, args) = build(&Dialect::postgres(), expr);
    assert_eq!(
        sql,
        r#"SELECT "id", "name" FROM "users" WHERE ("status" = $1 AND "age" > $2) ORDER BY "created_at" DESC LIMIT 10 OFFSET 20"#
    );
    assert_eq!(args, vec![Value::from("active"), Value::from(18)]);
}

#[test]
fn test_select_mssql_paging() {
    let (sql, _) = build(&Dialect::mssql(), select("users").limit(5).offset(10));
    assert_eq!(
        sql,
        "SELECT * FROM [users] ORDER BY (SELECT NULL) OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );

    let (sql, args) = build(
        &Dialect::mssql(),
        select("users").filter(col("id").eq(1)).order_by_asc("id").limit(1),
    );
    assert_eq!(
        sql,
        "SELECT * FROM [users] WHERE [id] = @p1 ORDER BY [id] ASC OFFSET 0 ROWS FETCH NEXT 1 ROWS ONLY"
    );
    assert_eq!(args.len(), 1);
}

#[test]
fn test_nested_groups() {
    let cond = col("a")
        .eq(1)
        .and(col("b").eq(2).or(col("c").is_null()))
        .and(col("d").like("x%").not());
    let (sql, args) = build(&Dialect::mysql(), select("t").filter(cond));
    assert_eq!(
        sql,
        "SELECT * FROM `t` WHERE (`a` = ? AND (`b` = ? OR `c` IS NULL) AND NOT (`d` LIKE ?))"
    );
    assert_eq!(args.len(), 3);
}

#[test]
fn test_in_lists() {
    let (sql, args) = build(
        &Dialect::postgres(),
        select("t").filter(col("id").in_list([1, 2, 3])),
    );
    assert_eq!(sql, r#"SELECT * FROM "t" WHERE "id" IN ($1, $2, $3)"#);
    assert_eq!(args.len(), 3);

    let (sql, _) = build(
        &Dialect::postgres(),
        select("t").filter(col("id").in_list(Vec::<i64>::new())),
    );
    assert_eq!(sql, r#"SELECT * FROM "t" WHERE "id" IN (NULL)"#);

    let (sql, _) = build(
        &Dialect::postgres(),
        select("t").filter(col("id").not_in(Vec::<i64>::new())),
    );
    assert_eq!(sql, r#"SELECT * FROM "t" WHERE 1=1"#);
}

#[test]
fn test_qualified_identifiers() {
    let (sql, _) = build(&Dialect::postgres(), select("public.users").columns(["u.*"]));
    assert_eq!(sql, r#"SELECT "u".* FROM "public"."users""#);
}

#[test]
fn test_insert_update_delete() {
    let d = Dialect::mysql();

    let (sql, args) = build(&d, insert("users").value("name", "bob").value("age", 3));
    assert_eq!(sql, "INSERT INTO `users` (`name`, `age`) VALUES (?, ?)");
    assert_eq!(args, vec![Value::from("bob"), Value::from(3)]);

    let (sql, args) = build(
        &d,
        update("users").set("name", "alice").filter(col("id").eq(9)),
    );
    assert_eq!(sql, "UPDATE `users` SET `name` = ? WHERE `id` = ?");
    assert_eq!(args, vec![Value::from("alice"), Value::from(9)]);

    let (sql, _) = build(&d, delete("users").filter(col("id").eq(9)));
    assert_eq!(sql, "DELETE FROM `users` WHERE `id` = ?");
}

#[test]
fn test_empty_insert_and_update_rejected() {
    let compiler_dialect = Dialect::mysql();
    let compiler = Compiler::new(&compiler_dialect);
    assert!(matches!(
        compiler.build(&insert("users").into()),
        Err(DbError::Validation(_))
    ));
    assert!(matches!(
        compiler.build(&update("users").into()),
        Err(DbError::Validation(_))
    ));
}

#[test]
fn test_build_named() {
    let d = Dialect::mysql();
    let expr: Expr = update("users").set("name", "x").filter(col("id").eq(1)).into();
    let (sql, args) = Compiler::new(&d).build_named(&expr).unwrap();
    assert_eq!(sql, "UPDATE `users` SET `name` = :p1 WHERE `id` = :p2");
    assert_eq!(args.get("p1"), Some(&Value::from("x")));
    assert_eq!(args.get("p2"), Some(&Value::from(1)));
}

#[test]
fn test_compile_routes_on_named_support() {
    let expr: Expr = update("users").set("name", "x").filter(col("id").eq(1)).into();

    for d in [Dialect::mysql(), Dialect::postgres(), Dialect::mssql()] {
        let compiler = Compiler::new(&d);
        assert!(d.is_named_supported());
        assert_eq!(compiler.compile(&expr).unwrap(), compiler.build(&expr).unwrap());
    }

    // Without named support the empty prefix is never scanned.
    let positional = Dialect::new("positional")
        .supports_named(false)
        .named_prefix("")
        .placeholder(crate::dialect::Placeholder::Dollar);
    let (sql, args) = Compiler::new(&positional).compile(&expr).unwrap();
    assert_eq!(sql, r#"UPDATE "users" SET "name" = $1 WHERE "id" = $2"#);
    assert_eq!(args, vec![Value::from("x"), Value::from(1)]);
}

#[test]
fn test_and_filter_on_expr() {
    let mut expr: Expr = select("users").filter(col("a").eq(1)).into();
    expr.and_filter(col("b").eq(2));
    let (sql, _) = Compiler::new(&Dialect::mysql()).build(&expr).unwrap();
    assert_eq!(sql, "SELECT * FROM `users` WHERE (`a` = ? AND `b` = ?)");

    let mut ins: Expr = insert("t").value("a", 1).into();
    ins.and_filter(col("b").eq(2));
    assert_eq!(ins, Expr::from(insert("t").value("a", 1)));
}
