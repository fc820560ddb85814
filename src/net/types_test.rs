use super::*;

fn alice() -> User {
    User {
        id: 1,
        username: "alice".into(),
        email: "alice@example.test".into(),
        role: Role::Pro,
        first_name: None,
        last_name: None,
        date_joined: None,
        last_login: None,
    }
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    let role: Role = serde_json::from_value(serde_json::json!("collector")).unwrap();
    assert_eq!(role, Role::Collector);
}

#[test]
fn role_parses_case_insensitive() {
    assert_eq!("PRO".parse::<Role>().unwrap(), Role::Pro);
    assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
    assert!("moderator".parse::<Role>().is_err());
}

#[test]
fn user_missing_role_defaults_to_collector() {
    let user: User = serde_json::from_value(serde_json::json!({
        "id": 3, "username": "bob", "email": "bob@example.test"
    }))
    .unwrap();
    assert_eq!(user.role, Role::Collector);
    assert!(user.first_name.is_none());
}

#[test]
fn user_reads_full_serializer_shape() {
    let user: User = serde_json::from_value(serde_json::json!({
        "id": 1, "username": "alice", "email": "alice@example.test",
        "first_name": "Alice", "last_name": null, "role": "admin",
        "date_joined": "2025-01-01T00:00:00Z", "last_login": null
    }))
    .unwrap();
    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.first_name.as_deref(), Some("Alice"));
    assert!(user.last_name.is_none());
}

#[test]
fn patch_applies_only_set_fields() {
    let mut user = alice();
    let patch = UserPatch { first_name: Some("Al".into()), ..UserPatch::default() };
    patch.apply_to(&mut user);
    assert_eq!(user.first_name.as_deref(), Some("Al"));
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.test");
}

#[test]
fn patch_serializes_without_unset_fields() {
    let patch = UserPatch { email: Some("new@example.test".into()), ..UserPatch::default() };
    assert_eq!(serde_json::to_value(&patch).unwrap(), serde_json::json!({"email": "new@example.test"}));
    assert!(UserPatch::default().is_empty());
    assert!(!patch.is_empty());
}

#[test]
fn nft_page_decodes_listing_serializer() {
    let page: Page<Nft> = serde_json::from_value(serde_json::json!({
        "count": 30,
        "next": "http://127.0.0.1:8000/api/users/alice/nfts?page=2",
        "previous": null,
        "results": [{
            "id": 9, "name": "Genesis", "image": "", "price": "0.25000000",
            "currency": "ETH", "owner": "alice", "creator": "bob",
            "image_src": "http://cdn.example.test/9.png"
        }]
    }))
    .unwrap();
    assert!(page.has_next());
    assert_eq!(page.results[0].price.as_deref(), Some("0.25000000"));
    assert_eq!(page.results[0].creator.as_deref(), Some("bob"));
}

#[test]
fn register_request_omits_optional_fields() {
    let req = RegisterRequest {
        username: "carol".into(),
        email: "carol@example.test".into(),
        password: "pw".into(),
        ..RegisterRequest::default()
    };
    let json = serde_json::to_value(&req).unwrap();
    assert!(json.get("role").is_none());
    assert_eq!(json["username"], "carol");
}
