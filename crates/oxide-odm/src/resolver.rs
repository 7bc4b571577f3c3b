//! Relationship resolution.
//!
//! A condition on a relationship field is a condition on the *target*
//! table. Before the outer query is compiled, each such condition is run
//! against its target table (selecting ids only) and replaced by the ids it
//! matched. Relationship conditions on the same level are resolved
//! concurrently; the first failure aborts the whole resolution.

use bson::Bson;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use oxide_query::{is_combinator, mix_q, Cond, Query, ResolvedRef, Value};
use tracing::debug;

use crate::error::{OdmError, Result};
use crate::registry::{RefTarget, Reference};
use crate::store::{DocumentStore, FindOptions};

/// A relationship condition waiting for its ids.
struct Pending<'r> {
    slot: usize,
    field: String,
    target: &'r RefTarget,
    sub: Cond,
}

/// Replaces every relationship condition in `cond` with resolved ids.
///
/// # Errors
///
/// Fails if a relationship field carries something other than a condition
/// map, if a relationship condition is empty, or if a store call fails.
pub async fn resolve<S: DocumentStore>(
    store: &S,
    reference: &Reference,
    table: &str,
    cond: Cond,
) -> Result<Cond> {
    resolve_level(store, reference, table, cond).await
}

/// Resolves relationships in `cond` and builds the query.
///
/// # Errors
///
/// See [`resolve`]; query construction errors are returned as well.
pub async fn build_query<S: DocumentStore>(
    store: &S,
    reference: &Reference,
    table: &str,
    cond: Cond,
) -> Result<Query> {
    let resolved = resolve(store, reference, table, cond).await?;
    Ok(mix_q(resolved)?)
}

fn resolve_level<'a, S: DocumentStore>(
    store: &'a S,
    reference: &'a Reference,
    table: &'a str,
    cond: Cond,
) -> BoxFuture<'a, Result<Cond>> {
    async move {
        let mut entries: Vec<(String, Value)> = Vec::with_capacity(cond.len());
        let mut pending = Vec::new();

        for (key, value) in cond {
            if is_combinator(&key) {
                let value = resolve_branches(store, reference, table, value).await?;
                entries.push((key, value));
                continue;
            }

            let field = key.strip_prefix('~').unwrap_or(&key).to_string();
            let Some(target) = reference.lookup(table, &field) else {
                entries.push((key, value));
                continue;
            };

            let sub = match value {
                Value::Ref(_) => {
                    entries.push((key, value));
                    continue;
                }
                Value::Cond(sub) => sub,
                Value::Bson(Bson::Document(doc)) => Cond::from_document(doc),
                _ => {
                    return Err(OdmError::RefCondition {
                        table: table.to_string(),
                        field,
                    })
                }
            };
            pending.push(Pending {
                slot: entries.len(),
                field,
                target,
                sub,
            });
            // placeholder, replaced once the ids are in
            entries.push((key, Value::Cond(Cond::new())));
        }

        let resolved = try_join_all(
            pending
                .into_iter()
                .map(|p| resolve_relation(store, reference, table, p)),
        )
        .await?;
        for (slot, ids) in resolved {
            entries[slot].1 = Value::Ref(ids);
        }

        Ok(entries.into_iter().collect())
    }
    .boxed()
}

async fn resolve_branches<S: DocumentStore>(
    store: &S,
    reference: &Reference,
    table: &str,
    value: Value,
) -> Result<Value> {
    match value {
        Value::Cond(c) => Ok(Value::Cond(resolve_level(store, reference, table, c).await?)),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(match item {
                    Value::Cond(c) => Value::Cond(resolve_level(store, reference, table, c).await?),
                    other => other,
                });
            }
            Ok(Value::List(out))
        }
        other => Ok(other),
    }
}

async fn resolve_relation<S: DocumentStore>(
    store: &S,
    reference: &Reference,
    table: &str,
    pending: Pending<'_>,
) -> Result<(usize, ResolvedRef)> {
    let Pending {
        slot,
        field,
        target,
        sub,
    } = pending;

    let sub = resolve_level(store, reference, &target.table, sub).await?;
    let filter = mix_q(sub)?.cond();
    if filter.is_empty() {
        return Err(OdmError::EmptyRefQuery {
            table: table.to_string(),
            field,
        });
    }

    let docs = store
        .find(&target.table, filter, &FindOptions::ids_only())
        .await?;
    let ids: Vec<Bson> = docs
        .into_iter()
        .filter_map(|mut doc| doc.remove("_id"))
        .collect();

    debug!(
        table,
        field = %field,
        target = %target.table,
        mode = %target.mode,
        ids = ids.len(),
        "resolved relationship"
    );
    Ok((slot, ResolvedRef::new(ids, target.mode)))
}
