//! Tests for negation, AND/OR/NOR composition and condition maps.

mod common;
use common::*;

use bson::{doc, Document};
use oxide_query::{cond, mix_q, not_q, q, Cond, MatchMode, Query, QueryError, ResolvedRef};
use serde_json::json;

// ===================================================================
// Negation
// ===================================================================

#[test]
fn negate_single_clause() {
    assert_eq!(
        not_q("age__gt", 30).unwrap().cond(),
        doc! { "age": { "$not": { "$gt": 30 } } }
    );
}

#[test]
fn negate_multi_clause_distributes_over_or() {
    let ids = vec![oid(HEX_A).into(), oid(HEX_B).into()];
    let query = not_q("tags", ResolvedRef::new(ids, MatchMode::Match)).unwrap();
    assert_eq!(
        query.cond(),
        doc! {
            "$or": [
                { "tags.$id": { "$not": { "$all": [oid(HEX_A), oid(HEX_B)] } } },
                { "tags": { "$not": { "$size": 2 } } },
            ]
        }
    );
}

#[test]
fn negations_on_same_field_union() {
    let query = Query::all_of([
        not_q("score__lt", 10).unwrap(),
        not_q("score__gt", 90).unwrap(),
    ]);
    assert_eq!(
        query.cond(),
        doc! { "score": { "$not": { "$lt": 10, "$gt": 90 } } }
    );
}

#[test]
fn later_negation_wins_on_same_operator() {
    let query = Query::all_of([not_q("k", 1).unwrap(), not_q("k", 2).unwrap()]);
    assert_eq!(query.cond(), doc! { "k": { "$not": { "$eq": 2 } } });
}

// ===================================================================
// AND / OR / NOR
// ===================================================================

#[test]
fn and_flattens_nodes() {
    let left = Query::all_of([q("a", 1).unwrap(), q("b", 2).unwrap()]);
    let right = q("c", 3).unwrap();
    let query = left.and([right]);
    assert_eq!(query.nodes().len(), 3);
    assert_eq!(
        query.cond(),
        doc! { "a": { "$eq": 1 }, "b": { "$eq": 2 }, "c": { "$eq": 3 } }
    );
}

#[test]
fn or_only_query_is_bare() {
    let query = Query::any_of([q("a", 1).unwrap(), q("b__gt", 2).unwrap()]);
    assert_eq!(
        query.cond(),
        doc! { "$or": [ { "a": { "$eq": 1 } }, { "b": { "$gt": 2 } } ] }
    );
}

#[test]
fn nor_only_query_is_bare() {
    let query = Query::none_of([q("a", 1).unwrap()]);
    assert_eq!(query.cond(), doc! { "$nor": [ { "a": { "$eq": 1 } } ] });
}

#[test]
fn or_and_nor_together_go_under_and() {
    let query = Query::any_of([q("a", 1).unwrap()]).nor([q("b", 2).unwrap()]);
    assert_eq!(
        query.cond(),
        doc! {
            "$and": [
                { "$or": [ { "a": { "$eq": 1 } } ] },
                { "$nor": [ { "b": { "$eq": 2 } } ] },
            ]
        }
    );
}

#[test]
fn empty_branches_leave_query_unchanged() {
    let base = q("x", 1).unwrap();
    assert_eq!(base.clone().or([Query::new()]), base);
    assert_eq!(base.clone().nor(Vec::new()), base);
    assert!(Query::any_of([Query::new()]).is_empty());
}

#[test]
fn raw_override_wins() {
    let query = Query::any_of([q("a", 1).unwrap()]).with_raw(Some(doc! { "$where": "1" }));
    assert_eq!(query.cond(), doc! { "$where": "1" });
    assert_eq!(query.with_raw(None).cond(), doc! { "$or": [ { "a": { "$eq": 1 } } ] });
}

#[test]
fn compiled_output_is_stable() {
    let query = q("a__in", vec![1, 2])
        .unwrap()
        .or([q("b", 1).unwrap(), q("c", 1).unwrap()]);
    let first: Document = query.cond();
    for _ in 0..3 {
        assert_eq!(query.cond(), first);
    }
}

// ===================================================================
// Resolved references
// ===================================================================

#[test]
fn resolved_reference_modes() {
    let ids = || vec![oid(HEX_A).into()];
    assert_eq!(
        q("owner", ResolvedRef::new(ids(), MatchMode::Default)).unwrap().cond(),
        doc! { "owner.$id": { "$in": [oid(HEX_A)] } }
    );
    assert_eq!(
        q("owner", ResolvedRef::new(ids(), MatchMode::All)).unwrap().cond(),
        doc! { "owner.$id": { "$all": [oid(HEX_A)] } }
    );
    assert_eq!(
        q("owner", ResolvedRef::new(ids(), MatchMode::Match)).unwrap().cond(),
        doc! { "owner.$id": { "$all": [oid(HEX_A)] }, "owner": { "$size": 1 } }
    );
}

#[test]
fn empty_resolved_reference_matches_nothing() {
    let query = q("owner", ResolvedRef::new(Vec::new(), MatchMode::Default)).unwrap();
    assert_eq!(query.cond(), doc! { "owner.$id": { "$in": [] } });
}

// ===================================================================
// Condition maps
// ===================================================================

#[test]
fn mixed_map_in_insertion_order() {
    let query = mix_q(cond! {
        "is_valid" => true,
        "age__gte" => 18,
        "~role" => "guest",
    })
    .unwrap();
    assert_eq!(
        query.cond(),
        doc! {
            "is_valid": { "$eq": true },
            "age": { "$gte": 18 },
            "role": { "$not": { "$eq": "guest" } },
        }
    );
}

#[test]
fn mixed_map_with_combinator_list() {
    let query = mix_q(cond! {
        "a" => 1,
        "$or" => vec![cond! { "b" => 2 }, cond! { "c__lt" => 3, "d" => 4 }],
    })
    .unwrap();
    assert_eq!(
        query.cond(),
        doc! {
            "a": { "$eq": 1 },
            "$and": [
                { "$or": [
                    { "b": { "$eq": 2 } },
                    { "c": { "$lt": 3 }, "d": { "$eq": 4 } },
                ] },
            ],
        }
    );
}

#[test]
fn mixed_map_accepts_prebuilt_queries() {
    let query = mix_q(cond! {
        "$nor" => vec![q("a", 1).unwrap(), q("b", 2).unwrap()],
    })
    .unwrap();
    assert_eq!(
        query.cond(),
        doc! { "$nor": [ { "a": { "$eq": 1 } }, { "b": { "$eq": 2 } } ] }
    );
}

#[test]
fn negated_combinator_rejected() {
    let err = mix_q(Cond::new().with("~$and", vec![cond! { "a" => 1 }])).unwrap_err();
    assert!(matches!(err, QueryError::NegatedCombinator(ref k) if k == "$and"));
}

#[test]
fn json_map_compiles() {
    assert_eq!(
        compile_json(json!({
            "status": "open",
            "$or": [{ "priority__gte": 3 }, { "owner": null }],
        })),
        doc! {
            "status": { "$eq": "open" },
            "$and": [
                { "$or": [
                    { "priority": { "$gte": 3 } },
                    { "owner": { "$eq": null } },
                ] },
            ],
        }
    );
}

#[test]
fn json_or_object_splits_per_key() {
    assert_eq!(
        compile_json(json!({ "$or": { "a": 1, "b": 2 } })),
        doc! { "$or": [ { "a": { "$eq": 1 } }, { "b": { "$eq": 2 } } ] }
    );
}

#[test]
fn json_object_id_literal() {
    assert_eq!(
        compile_json(json!({ "_id__in": [{ "$oid": HEX_A }, HEX_B] })),
        doc! { "_id": { "$in": [oid(HEX_A), oid(HEX_B)] } }
    );
}

#[test]
fn json_errors_surface() {
    assert!(matches!(
        compile_json_err(json!({ "~$or": [{ "a": 1 }] })),
        QueryError::NegatedCombinator(_)
    ));
    assert!(matches!(
        compile_json_err(json!({ "a__nope": 1 })),
        QueryError::UnknownOperator { .. }
    ));
    assert!(matches!(
        compile_json_err(json!(["not", "a", "map"])),
        QueryError::InvalidJson(_)
    ));
}
