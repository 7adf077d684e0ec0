use std::time::Duration;

use http::{header, HeaderMap, HeaderValue};
use speak_core_types::{AccessRight, Caller, InboundRequest, ItemRef, ANONYMOUS_USER};
use speak_request_gate::{CallerResolver, ItemPermissions, TicketValidator};
use speak_session_store::{
    load_seeds_from_reader, parse_seeds_str, InMemoryTicketStore, ItemAccessTable, ItemGrant, SessionError, TicketSeed,
    TICKET_HEADER,
};

fn with_cookie(value: &str) -> InboundRequest {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
    InboundRequest::new("GET", "/x", headers, Vec::new())
}

fn with_header(ticket: &str) -> InboundRequest {
    let mut headers = HeaderMap::new();
    headers.insert(TICKET_HEADER, HeaderValue::from_str(ticket).unwrap());
    InboundRequest::new("GET", "/x", headers, Vec::new())
}

fn seed(id: &str, user: &str, ttl: Option<&str>) -> TicketSeed {
    TicketSeed {
        id: id.into(),
        user: user.into(),
        roles: vec!["sitecore\\Author".into()],
        administrator: false,
        ttl: ttl.map(str::to_string),
    }
}

#[tokio::test]
async fn seeded_ticket_identifies_caller() {
    let store = InMemoryTicketStore::from_seeds(&[seed("t-1", "sitecore\\jane", Some("8h"))]).unwrap();
    let request = with_cookie("lang=en; sitecore_userticket=t-1");

    assert!(store.is_current_ticket_valid(&request).await);
    let caller = store.current_user(&request).await;
    assert_eq!(caller.name, "sitecore\\jane");
    assert!(caller.is_in_role("sitecore\\author"));
}

#[tokio::test]
async fn header_is_used_without_cookie() {
    let store = InMemoryTicketStore::new();
    let id = store.issue(Caller::new("sitecore\\admin").administrator(), None);
    let request = with_header(&id);
    assert!(store.is_current_ticket_valid(&request).await);
    assert!(store.current_user(&request).await.is_administrator);
}

#[tokio::test]
async fn unknown_or_missing_ticket_is_anonymous() {
    let store = InMemoryTicketStore::new();
    let missing = InboundRequest::get("/x");
    assert!(!store.is_current_ticket_valid(&missing).await);
    assert_eq!(store.current_user(&missing).await.name, ANONYMOUS_USER);

    let unknown = with_cookie("sitecore_userticket=nope");
    assert!(!store.is_current_ticket_valid(&unknown).await);
}

#[tokio::test]
async fn expired_tickets_are_rejected_and_dropped() {
    let store = InMemoryTicketStore::new();
    store.insert("old", Caller::new("sitecore\\jane"), Some(Duration::ZERO));
    store.insert("live", Caller::new("sitecore\\bob"), None);

    assert!(!store.is_current_ticket_valid(&with_cookie("sitecore_userticket=old")).await);
    assert_eq!(store.len(), 1);
    assert_eq!(store.purge_expired(), 0);
    assert!(store.revoke("live"));
    assert!(store.is_empty());
}

#[test]
fn bad_ttl_rejects_whole_seed_list() {
    let store = InMemoryTicketStore::new();
    let result = store.seed(&[seed("a", "u", Some("1h")), seed("b", "v", Some("whenever"))]);
    assert!(matches!(result, Err(SessionError::InvalidTtl(ttl)) if ttl == "whenever"));
    assert!(store.is_empty());
}

#[test]
fn seeds_parse_from_yaml() {
    let seeds: Vec<TicketSeed> = parse_seeds_str(
        r#"
- id: t-1
  user: sitecore\admin
  administrator: true
- id: t-2
  user: sitecore\jane
  roles: [sitecore\Author]
  ttl: 30m
"#,
    )
    .unwrap();
    assert_eq!(seeds.len(), 2);
    assert!(seeds[0].administrator);
    assert_eq!(seeds[1].ttl.as_deref(), Some("30m"));
}

#[test]
fn grants_load_from_reader() {
    let raw = r#"[{"item": "/sitecore/content/Home", "rights": ["read"], "to": ["sitecore\\Editors"]}]"#;
    let grants: Vec<ItemGrant> = load_seeds_from_reader(std::io::Cursor::new(raw)).unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].to, vec!["sitecore\\Editors".to_string()]);

    let garbage = load_seeds_from_reader::<Vec<ItemGrant>, _>(std::io::Cursor::new("{ nope"));
    assert!(matches!(garbage, Err(SessionError::Deserialize(_))));
}

fn home() -> ItemRef {
    ItemRef::new("/sitecore/content/Home", "{110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9}")
}

#[tokio::test]
async fn grants_by_id_path_and_role() {
    let table = ItemAccessTable::from_grants(&[
        ItemGrant {
            item: "{110d559f-dea5-42ea-9c1c-8a5df7e70ef9}".into(),
            rights: vec!["item:write".into()],
            to: vec!["sitecore\\jane".into()],
        },
        ItemGrant {
            item: "/sitecore/content/Home".into(),
            rights: vec!["read".into(), "delete".into()],
            to: vec!["sitecore\\Editors".into()],
        },
    ])
    .unwrap();

    let jane = Caller::new("sitecore\\jane");
    let editor = Caller::new("sitecore\\bob").with_roles(["sitecore\\editors"]);
    let visitor = Caller::new("sitecore\\eve");

    assert!(table.has_access(&jane, &home(), AccessRight::Write).await);
    assert!(!table.has_access(&jane, &home(), AccessRight::Delete).await);
    assert!(table.has_access(&editor, &home(), AccessRight::Delete).await);
    assert!(!table.has_access(&visitor, &home(), AccessRight::Read).await);
    assert!(table.has_access(&Caller::new("sitecore\\admin").administrator(), &home(), AccessRight::Admin).await);
}

#[test]
fn admin_right_implies_others() {
    let table = ItemAccessTable::new();
    table.grant("/sitecore/content/Home", "sitecore\\owner", AccessRight::Admin);
    assert!(table.check(&Caller::new("sitecore\\Owner"), &home(), AccessRight::Rename));
    assert!(table.revoke_all("/SITECORE/content/home"));
    assert!(!table.check(&Caller::new("sitecore\\owner"), &home(), AccessRight::Rename));
}

#[test]
fn invalid_grants_are_reported() {
    let unknown_right = ItemAccessTable::from_grants(&[ItemGrant {
        item: "/x".into(),
        rights: vec!["item:fly".into()],
        to: vec!["sitecore\\jane".into()],
    }]);
    assert!(matches!(unknown_right, Err(SessionError::InvalidGrant { .. })));

    let nobody = ItemAccessTable::from_grants(&[ItemGrant {
        item: "/x".into(),
        rights: vec!["read".into()],
        to: Vec::new(),
    }]);
    assert!(matches!(nobody, Err(SessionError::InvalidGrant { .. })));
}
