use super::*;
use crate::dialect::Dialect;
use serde_json::json;
use std::fs;

fn mysql_set() -> TemplateSet {
    TemplateSet::with_builtin(Dialect::mysql()).unwrap()
}

#[test]
fn test_helpers_registered() {
    let set = mysql_set();
    for name in helpers::helper_names() {
        let tpl = format!("helper/{name}.sql");
        // Every helper name must be callable without a parse error.
        set.register(&tpl, &format!("{{{{{name} x}}}}")).unwrap();
    }
}

#[test]
fn test_where_helper_emits_every_entry() {
    let set = mysql_set();
    set.register("user/find.sql", "SELECT * FROM `user`{{where this}}")
        .unwrap();
    let sql = set
        .render("user/find.sql", &json!({"name": "user_6", "age": 0}))
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `user` WHERE `age`=0 AND `name`='user_6' ");

    let sql = set
        .render("user/find.sql", &json!({"active": false}))
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `user` WHERE `active`=FALSE ");
}

#[test]
fn test_where_helper_uses_like_for_wildcards() {
    let set = mysql_set();
    set.register("q.sql", "SELECT 1{{where this}}").unwrap();
    let sql = set.render("q.sql", &json!({"name": "bob%"})).unwrap();
    assert_eq!(sql, "SELECT 1 WHERE `name` LIKE 'bob%' ");
}

#[test]
fn test_record_where_helper_skips_zero_values() {
    let set = mysql_set();
    set.register("q.sql", "SELECT 1{{recordWhere this}}").unwrap();
    let sql = set
        .render("q.sql", &json!({"name": "bob%", "age": 0, "active": false}))
        .unwrap();
    assert_eq!(sql, "SELECT 1 WHERE `name`='bob%' ");

    set.register("n.sql", "SELECT 1{{namedRecordWhere this}}").unwrap();
    let sql = set
        .render("n.sql", &json!({"id": 0, "name": "bob"}))
        .unwrap();
    assert_eq!(sql, "SELECT 1 WHERE `name`=:name ");
}

#[test]
fn test_named_where_rejects_non_identifier_keys() {
    let set = mysql_set();
    set.register("q.sql", "SELECT 1{{nwhere this}}").unwrap();
    let err = set.render("q.sql", &json!({"user-id": 1})).unwrap_err();
    assert!(matches!(err, DbError::Render(ref m) if m.contains("user-id")), "{err}");

    // Inline rendering quotes the key and inlines the value.
    set.register("i.sql", "SELECT 1{{where this}}").unwrap();
    let sql = set.render("i.sql", &json!({"user-id": 1})).unwrap();
    assert_eq!(sql, "SELECT 1 WHERE `user-id`=1 ");
}

#[test]
fn test_named_where_helper() {
    let set = mysql_set();
    set.register("user/find.sql", "SELECT * FROM `user`{{nwhere this}}")
        .unwrap();
    let sql = set
        .render("user/find.sql", &json!({"name": "user_6"}))
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `user` WHERE `name`=:name ");

    set.register("user/find2.sql", "SELECT 1{{namedWhere this join=\"OR\"}}")
        .unwrap();
    let sql = set
        .render("user/find2.sql", &json!({"a": 1, "b": 2}))
        .unwrap();
    assert_eq!(sql, "SELECT 1 WHERE `a`=:a OR `b`=:b ");
}

#[test]
fn test_map_where_helper_uses_like() {
    let set = mysql_set();
    set.register("q.sql", "SELECT 1{{mapWhere this}}").unwrap();
    let sql = set.render("q.sql", &json!({"name": "bob%"})).unwrap();
    assert_eq!(sql, "SELECT 1 WHERE `name` LIKE 'bob%' ");
}

#[test]
fn test_value_list_and_name_helpers() {
    let set = TemplateSet::new(Dialect::postgres());
    set.register(
        "q.sql",
        "SELECT * FROM {{n table}} WHERE {{sqlName col}} IN ({{list ids}}) AND note={{v note}} -- {{driver}}/{{dialect}}",
    )
    .unwrap();
    let sql = set
        .render(
            "q.sql",
            &json!({"table": "users", "col": "id", "ids": [1, 2, 3], "note": "it's"}),
        )
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE "id" IN (1,2,3) AND note='it''s' -- postgres/postgres"#
    );
}

#[test]
fn test_no_html_escaping() {
    let set = mysql_set();
    set.register("q.sql", "SELECT {{v s}}").unwrap();
    let sql = set.render("q.sql", &json!({"s": "<a & b>"})).unwrap();
    assert_eq!(sql, "SELECT '<a & b>'");
}

#[test]
fn test_order_by_helper_shapes() {
    let set = mysql_set();
    set.register("q.sql", "SELECT 1{{orderBy order}}").unwrap();

    let sql = set
        .render("q.sql", &json!({"order": {"created_at": "desc", "id": "asc"}}))
        .unwrap();
    assert_eq!(sql, "SELECT 1 ORDER BY `created_at` DESC,`id` ASC ");

    let sql = set
        .render("q.sql", &json!({"order": [["id", "DESC"], "name"]}))
        .unwrap();
    assert_eq!(sql, "SELECT 1 ORDER BY `id` DESC,`name` ASC ");

    let sql = set.render("q.sql", &json!({})).unwrap();
    assert_eq!(sql, "SELECT 1");
}

#[test]
fn test_builtin_templates() {
    let set = mysql_set();
    let columns = json!([
        {"name": "id", "primary_key": true},
        {"name": "name"},
        {"name": "email"},
    ]);

    let sql = set
        .render("builtin/insert.sql", &json!({"table": "users", "columns": columns}))
        .unwrap();
    assert_eq!(sql, "INSERT INTO `users` (`name`,`email`) VALUES (:name,:email)");

    let sql = set
        .render(
            "builtin/update.sql",
            &json!({"table": "users", "columns": columns, "filter": {"id": 7}}),
        )
        .unwrap();
    assert_eq!(sql, "UPDATE `users` SET `name`=:name,`email`=:email WHERE `id`=:id ");

    let sql = set
        .render(
            "builtin/select.sql",
            &json!({"table": "users", "filter": {"name": "bob"}, "order": {"id": "desc"}}),
        )
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` WHERE `name`='bob'  ORDER BY `id` DESC "
    );

    // Zero-valued filters are conditions, not omissions.
    let sql = set
        .render("builtin/delete.sql", &json!({"table": "users", "filter": {"id": 0}}))
        .unwrap();
    assert_eq!(sql, "DELETE FROM `users` WHERE `id`=0 ");

    let sql = set
        .render(
            "builtin/update.sql",
            &json!({"table": "users", "columns": columns, "filter": {"active": false}}),
        )
        .unwrap();
    assert_eq!(sql, "UPDATE `users` SET `name`=:name,`email`=:email WHERE `active`=:active ");

    let sql = set
        .render(
            "builtin/select.sql",
            &json!({"table": "users", "filter": {"name": "bo%"}}),
        )
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `users` WHERE `name` LIKE 'bo%' ");

    let sql = set
        .render("builtin/count.sql", &json!({"table": "users"}))
        .unwrap();
    assert_eq!(sql, "SELECT COUNT(*) FROM `users`");
}

#[test]
fn test_render_sql_dispatch() {
    let set = mysql_set();
    set.register("a/b.sql", "SELECT {{v this}}").unwrap();

    assert_eq!(set.render_sql("a/b.sql", &json!(5)).unwrap(), "SELECT 5");

    // Inline SQL is returned byte-for-byte, even if it looks like a template.
    let inline = "SELECT '{{v this}}'  ";
    assert_eq!(set.render_sql(inline, &json!(5)).unwrap(), inline);

    assert!(matches!(
        set.render_sql("missing.sql", &json!({})),
        Err(DbError::Render(_))
    ));
}

#[test]
fn test_register_parse_error() {
    let set = mysql_set();
    assert!(matches!(
        set.register("bad.sql", "SELECT {{#if}}"),
        Err(DbError::Template(_))
    ));
}

#[test]
fn test_resolve_first_existing_candidate() {
    let set = mysql_set();
    set.register("user/find.sql", "SELECT 2").unwrap();
    set.register("find.sql", "SELECT 3").unwrap();

    let candidates = vec![
        "app/user/find.sql".to_string(),
        "user/find.sql".to_string(),
        "find.sql".to_string(),
    ];
    assert_eq!(set.resolve(&candidates).unwrap(), "user/find.sql");

    let missing = vec!["nope.sql".to_string()];
    match set.resolve(&missing) {
        Err(DbError::TemplateNotFound { candidates }) => assert_eq!(candidates, missing),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_replace_is_wholesale() {
    let set = mysql_set();
    set.register("old.sql", "SELECT 1").unwrap();
    set.replace([("new.sql", "SELECT {{v 2}}")]).unwrap();

    assert!(!set.contains("old.sql"));
    assert!(!set.contains("builtin/insert.sql"));
    assert_eq!(set.render("new.sql", &json!({})).unwrap(), "SELECT 2");

    // A parse error leaves the current set in place.
    assert!(set.replace([("broken.sql", "{{#if}}")]).is_err());
    assert!(set.contains("new.sql"));
}

#[test]
fn test_load_directory_keeps_relative_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("user")).unwrap();
    fs::write(dir.path().join("user/find.sql"), "SELECT * FROM u{{where this}}").unwrap();
    fs::write(dir.path().join("count.sql"), "SELECT COUNT(*) FROM u").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let set = mysql_set();
    let loaded = set
        .load(&TemplateSource::new(dir.path()).pattern("**/*.sql"))
        .unwrap();
    assert_eq!(loaded, 2);
    assert!(set.contains("user/find.sql"));
    assert!(set.contains("count.sql"));
    assert!(!set.contains("notes.txt"));
}

#[test]
fn test_concurrent_render_and_register() {
    let set = std::sync::Arc::new(mysql_set());
    set.register("q.sql", "SELECT {{v this}}").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let set = set.clone();
            std::thread::spawn(move || {
                for j in 0..50 {
                    if i % 2 == 0 {
                        assert_eq!(set.render("q.sql", &json!(j)).unwrap(), format!("SELECT {j}"));
                    } else {
                        set.register(&format!("t{i}_{j}.sql"), "SELECT 1").unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(set.contains("t1_49.sql"));
}
