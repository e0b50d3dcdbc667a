use super::*;

#[allow(dead_code)]
struct OrderMapper;

#[test]
fn namespace_from_type_path() {
    let ns = Namespace::from_type_path("shop_api::repo::OrderMapper");
    assert_eq!(ns.package, "shop_api/repo");
    assert_eq!(ns.type_name, "order_mapper");
}

#[test]
fn namespace_drops_generics() {
    let ns = Namespace::from_type_path("app::Paged<app::User>");
    assert_eq!(ns.package, "app");
    assert_eq!(ns.type_name, "paged");
}

#[test]
fn namespace_of_local_type() {
    let ns = Namespace::of::<OrderMapper>();
    assert_eq!(ns.package, "sqlmapper/mapper/tests");
    assert_eq!(ns.type_name, "order_mapper");
}

#[test]
fn candidate_order() {
    let ns = Namespace::from_type_path("shop::repo::OrderMapper");
    assert_eq!(
        ns.candidates("FindByCustomer"),
        vec![
            "shop/repo/order_mapper/find_by_customer.sql",
            "repo/order_mapper/find_by_customer.sql",
            "order_mapper/find_by_customer.sql",
            "find_by_customer.sql",
        ]
    );
}

#[test]
fn candidates_deduplicated() {
    // single-segment package: first two candidates coincide
    let ns = Namespace::from_type_path("shop::OrderMapper");
    assert_eq!(
        ns.candidates("list"),
        vec![
            "shop/order_mapper/list.sql",
            "order_mapper/list.sql",
            "list.sql"
        ]
    );

    let bare = Namespace::from_type_path("OrderMapper");
    assert_eq!(bare.candidates("list"), vec!["order_mapper/list.sql", "list.sql"]);
}

#[test]
fn inline_name_uses_full_package() {
    let ns = Namespace::from_type_path("shop::repo::OrderMapper");
    assert_eq!(ns.inline_name("count"), "shop/repo/order_mapper/count.sql");
}

#[tokio::test]
async fn unbound_handles_fail_with_nil_handle() {
    let exec = ExecFn::default();
    assert!(!exec.is_bound());
    assert!(exec.templates().is_empty());
    assert!(matches!(exec.call(&[]).await, Err(DbError::NilHandle)));

    let get: GetFn<i64> = GetFn::default();
    assert!(get.call(&[]).await.unwrap_err().is_nil_handle());

    let select: NamedSelectFn<String> = NamedSelectFn::default();
    assert!(select.call(&serde_json::json!({})).await.unwrap_err().is_nil_handle());

    let tx = TxFn::default();
    let res = tx.call(|_tx| async { Ok(()) }).await;
    assert!(matches!(res, Err(DbError::NilHandle)));
}
