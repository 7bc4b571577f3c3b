#![allow(dead_code)]

use bson::oid::ObjectId;
use bson::Document;
use oxide_query::{mix_q, q, Cond, QueryError, Value};

pub const HEX_A: &str = "5f1f1f1f1f1f1f1f1f1f1f1a";
pub const HEX_B: &str = "5f1f1f1f1f1f1f1f1f1f1f1b";

pub fn oid(hex: &str) -> ObjectId {
    ObjectId::parse_str(hex).unwrap_or_else(|e| panic!("bad hex {hex}: {e}"))
}

/// Compiles a single predicate.
pub fn compile(key: &str, value: impl Into<Value>) -> Document {
    q(key, value)
        .unwrap_or_else(|e| panic!("Failed to build {key}: {e}"))
        .cond()
}

/// Expects building a single predicate to fail.
pub fn compile_err(key: &str, value: impl Into<Value>) -> QueryError {
    q(key, value).expect_err(&format!("Expected error for key: {key}"))
}

/// Compiles a JSON condition map.
pub fn compile_json(json: serde_json::Value) -> Document {
    let cond = Cond::from_json(json.clone())
        .unwrap_or_else(|e| panic!("Failed to parse: {json}\nError: {e}"));
    mix_q(cond)
        .unwrap_or_else(|e| panic!("Failed to build: {json}\nError: {e}"))
        .cond()
}

/// Expects compiling a JSON condition map to fail.
pub fn compile_json_err(json: serde_json::Value) -> QueryError {
    Cond::from_json(json.clone())
        .and_then(mix_q)
        .expect_err(&format!("Expected error for: {json}"))
}
