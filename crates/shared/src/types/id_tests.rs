use super::*;
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_typed_id_creation() {
    let id = UserId::new();
    assert!(!id.to_string().is_empty());
}

#[test]
fn test_typed_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = GroupId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_display() {
    let uuid = Uuid::new_v4();
    let id = ItemId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_typed_id_from_str() {
    let uuid = Uuid::new_v4();
    let id = SnapshotId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(UserId::from_str("invalid").is_err());
}

#[test]
fn test_typed_id_ordering_follows_uuid() {
    let low = UserId::from_uuid(Uuid::from_u128(1));
    let high = UserId::from_uuid(Uuid::from_u128(2));

    let ordered: Vec<_> = [high, low].into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    assert_eq!(ordered, vec![low, high]);
}

#[test]
fn test_typed_id_serde_is_transparent() {
    let uuid = Uuid::from_u128(42);
    let json = serde_json::to_string(&TransferId::from_uuid(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));
}
