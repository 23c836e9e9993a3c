//! 路由表属性测试

use flare_rpc_core::error::ErrorCode;
use flare_rpc_core::resolver::{Route, RouteTable};

fn route(service: &str, address: &str) -> Route {
    Route::new(service, address)
}

#[test]
fn test_hash_is_deterministic() {
    let a = route("users", "10.0.0.1:9000");
    let b = route("users", "10.0.0.1:9000");
    assert_eq!(a.hash(), b.hash());

    let c = route("users", "10.0.0.2:9000");
    assert_ne!(a.hash(), c.hash(), "different address must hash differently");
}

#[test]
fn test_create_then_duplicate_is_rejected() {
    let table = RouteTable::new();
    table
        .create(route("users", "10.0.0.1:9000"))
        .expect("first create should succeed");

    let err = table
        .create(route("users", "10.0.0.1:9000"))
        .expect_err("second create of the same route must fail");
    assert_eq!(err.code(), Some(ErrorCode::DuplicateRoute));
}

#[test]
fn test_update_is_idempotent() {
    let table = RouteTable::new();
    table.update(route("users", "10.0.0.1:9000")).unwrap();
    table.update(route("users", "10.0.0.1:9000")).unwrap();

    let routes = table.find("users").expect("routes should exist");
    assert_eq!(routes.len(), 1, "double update must leave a single entry");
}

#[test]
fn test_update_creates_missing_entry() {
    let table = RouteTable::new();
    table.update(route("billing", "10.0.0.5:9100")).unwrap();

    let routes = table.find("billing").unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].address, "10.0.0.5:9100");
}

#[test]
fn test_delete_removes_service_key_entirely() {
    let table = RouteTable::new();
    let r = route("users", "10.0.0.1:9000");
    table.create(r.clone()).unwrap();
    table.delete(&r).expect("delete should succeed");

    let err = table.find("users").expect_err("service must be gone");
    assert_eq!(err.code(), Some(ErrorCode::RouteNotFound));
    assert!(table.is_empty(), "empty service map must not leak");
    assert!(table.services().is_empty());
}

#[test]
fn test_delete_missing_route_fails() {
    let table = RouteTable::new();
    let err = table
        .delete(&route("users", "10.0.0.1:9000"))
        .expect_err("deleting from empty table must fail");
    assert_eq!(err.code(), Some(ErrorCode::RouteNotFound));

    // 服务存在但哈希不存在
    table.create(route("users", "10.0.0.1:9000")).unwrap();
    let err = table
        .delete(&route("users", "10.0.0.2:9000"))
        .expect_err("deleting unknown hash must fail");
    assert_eq!(err.code(), Some(ErrorCode::RouteNotFound));
}

#[test]
fn test_find_empty_service_returns_all_routes() {
    let table = RouteTable::new();
    table.create(route("users", "10.0.0.1:9000")).unwrap();
    table.create(route("users", "10.0.0.2:9000")).unwrap();
    table.create(route("billing", "10.0.0.5:9100")).unwrap();

    let all = table.find("").expect("find all should succeed");
    assert_eq!(all.len(), 3);
}

#[test]
fn test_find_unknown_service_fails() {
    let table = RouteTable::new();
    table.create(route("users", "10.0.0.1:9000")).unwrap();

    let err = table.find("billing").expect_err("unknown service must fail");
    assert_eq!(err.code(), Some(ErrorCode::RouteNotFound));
}

#[test]
fn test_replace_service_syncs_removals() {
    let table = RouteTable::new();
    table.create(route("users", "10.0.0.1:9000")).unwrap();
    table.create(route("users", "10.0.0.2:9000")).unwrap();

    table.replace_service("users", vec![route("users", "10.0.0.3:9000")]);
    let routes = table.find("users").unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].address, "10.0.0.3:9000");

    // 空集合时服务键被整体移除
    table.replace_service("users", vec![]);
    assert!(table.find("users").is_err());
    assert!(table.is_empty());
}
