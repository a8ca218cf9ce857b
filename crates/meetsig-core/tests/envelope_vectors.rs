//! Envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use meetsig_core::protocol::{keys, Envelope};
use meetsig_core::ClientCode;

fn load(name: &str) -> Vec<u8> {
    fs::read(format!("tests/vectors/{name}")).unwrap()
}

#[test]
fn parse_targeted_offer() {
    let env = Envelope::decode(&load("offer_targeted.json")).unwrap();
    assert_eq!(env.key, "offer");
    assert_eq!(env.target_identity, "bob");
    assert!(env.value_str().contains("\"sdp\""));
    assert!(!env.system);
}

#[test]
fn unknown_fields_are_tolerated_and_routing_is_restamped() {
    let mut env = Envelope::decode(&load("candidate_broadcast.json")).unwrap();
    assert!(env.target_identity.is_empty());

    env.stamp("alice", "R1");
    let wire: serde_json::Value = serde_json::from_str(&env.encode().unwrap()).unwrap();
    assert_eq!(wire["sender_identity"], "alice");
    assert_eq!(wire["room_identity"], "R1");
    assert_ne!(wire["timestamp"], 42);
    assert_eq!(wire["value"]["sdpMLineIndex"], 0);
    assert!(wire.get("client_extra").is_none());
}

#[test]
fn null_fields_decode_as_defaults() {
    let env = Envelope::decode(&load("nulls.json")).unwrap();
    assert_eq!(env.key, "answer");
    assert!(env.target_identity.is_empty());
    assert!(env.sender_identity.is_empty());
    assert_eq!(env.timestamp, 0);
    assert!(!env.system);
    assert!(env.value_str().contains("\"sdp\""));
}

#[test]
fn null_key_is_not_routable() {
    let env = Envelope::decode(br#"{"key":null,"value":1}"#).unwrap();
    assert!(!env.has_key());
}

#[test]
fn missing_key_decodes_but_is_not_routable() {
    let env = Envelope::decode(&load("key_missing.json")).unwrap();
    assert!(!env.has_key());
}

#[test]
fn malformed_json_is_bad_request() {
    let err = Envelope::decode(b"{\"key\": ").unwrap_err();
    assert_eq!(err.client_code(), ClientCode::BadRequest);
}

#[test]
fn peer_list_shape() {
    let peers = vec!["alice".to_string(), "bob".to_string()];
    let env = Envelope::peer_list("R1", &peers).unwrap();
    let wire: serde_json::Value = serde_json::from_str(&env.encode().unwrap()).unwrap();
    assert_eq!(wire["key"], keys::PEER_LIST);
    assert_eq!(wire["sender_identity"], "system");
    assert_eq!(wire["system"], true);
    assert_eq!(wire["value"], serde_json::json!({ "peers": ["alice", "bob"] }));
}
