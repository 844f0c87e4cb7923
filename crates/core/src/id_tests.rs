// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

#[test]
fn define_id_display_and_as_str() {
    let id = TestId::new("hello");
    assert_eq!(id.as_str(), "hello");
    assert_eq!(id.to_string(), "hello");
}

#[test]
fn define_id_compares_with_str() {
    let id: TestId = "abc".into();
    assert_eq!(id, "abc");
    assert_eq!(id, *"abc");
}

#[test]
fn define_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(TestId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
    let id = TestId::new("key");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "key");
}

#[test]
fn define_id_serializes_transparently() {
    let id = TestId::new("serde-test");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"serde-test\"");
    let back: TestId = serde_json::from_str("\"serde-test\"").unwrap();
    assert_eq!(back, id);
}

#[yare::parameterized(
    truncates = { "abcdefghijklmnop", 8, "abcdefgh" },
    shorter   = { "abc",              8, "abc" },
    exact     = { "abcdefgh",         8, "abcdefgh" },
)]
fn define_id_short(raw: &str, n: usize, expected: &str) {
    assert_eq!(TestId::new(raw).short(n), expected);
}

#[test]
fn uuid_gen_creates_unique_hex_tokens() {
    let id_gen = UuidIdGen;
    let a = id_gen.next();
    let b = id_gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn uuid_gen_short_hex_is_six_hex_chars() {
    let hex = UuidIdGen.short_hex();
    assert_eq!(hex.len(), 6);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn sequential_gen_is_predictable_and_shared_across_clones() {
    let first = SequentialIdGen::new("s");
    let second = first.clone();
    assert_eq!(first.next(), "s-1");
    assert_eq!(second.next(), "s-2");
    assert_eq!(first.short_hex(), "000003");
}
