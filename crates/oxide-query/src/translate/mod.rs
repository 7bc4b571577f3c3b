//! Operator-token translation.
//!
//! Turns the `__token` suffix of a DSL key plus its operand into a store
//! operator and a store-native operand. Pure functions, no state.

pub mod geo;
mod pattern;

use bson::Bson;

use crate::error::{QueryError, Result};
use crate::node::Operator;

pub use geo::{meters_to_radians, EARTH_RADIUS_MILES, METERS_PER_MILE};

/// Translates `token` applied to `operand`.
///
/// `key` is the full DSL key, used for error messages.
pub fn translate(key: &str, token: &str, operand: Bson) -> Result<(Operator, Bson)> {
    if let Some(op) = Operator::from_token(token) {
        if op == Operator::Regex {
            return pattern::regex_operand(key, operand).map(|d| (op, Bson::Document(d)));
        }
        return Ok((op, operand));
    }

    if let Some(out) = pattern::translate(key, token, &operand) {
        return out.map(|d| (Operator::Regex, Bson::Document(d)));
    }

    if let Some(out) = geo::translate(token, operand) {
        return out.map(|(op, d)| (op, Bson::Document(d)));
    }

    Err(QueryError::UnknownOperator {
        key: key.to_string(),
        op: token.to_string(),
    })
}
