//! Serde shape tests for the types that cross crate and process boundaries.

use pretty_assertions::assert_eq;
use serde_json::json;
use warden_core::{Membership, Organization, Principal, Role, UpstreamOrganization};

#[test]
fn principal_serializes_with_kind_tag() {
    let value = serde_json::to_value(Principal::cluster(1, "7")).unwrap();
    assert_eq!(
        value,
        json!({"kind": "cluster_service", "organization_id": 1, "cluster_id": "7"})
    );
}

#[test]
fn membership_serializes_role_as_string() {
    let membership = Membership {
        organization: Organization {
            id: 5,
            name: "acme".into(),
            provider: "github".into(),
        },
        role: Role::Admin,
    };
    let value = serde_json::to_value(&membership).unwrap();
    assert_eq!(value["role"], json!("admin"));
    assert_eq!(value["organization"]["name"], json!("acme"));
}

#[test]
fn upstream_organization_groups_default_to_empty() {
    let org: UpstreamOrganization =
        serde_json::from_value(json!({"name": "acme", "provider": "gitlab"})).unwrap();
    assert!(org.groups.is_empty());
}
