//! Eligibility rules for key-based routing.
//!
//! Key affinity only pays off for operations whose consensus cost depends on
//! which node coordinates them. The classifier is a pure predicate over the
//! configured [`AffinityMode`] and the request's structure; it allocates
//! nothing and touches no shared state.

use serde::{Deserialize, Serialize};

use crate::routing::request::{AttributeAction, DbRequest, DeleteItem, PutItem, UpdateItem};

/// Which requests are eligible for key-based routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityMode {
    /// Key-based routing is off; every request load-balances.
    #[default]
    Disabled,
    /// Route every single-item write by its partition key.
    AnyWrite,
    /// Route only single-item writes that read the current value first
    /// (conditional writes, read-back return values, in-place arithmetic).
    ReadModifyWrite,
}

/// Should this request be routed by its partition key?
///
/// Multi-item batches are never eligible: they carry several partition keys
/// and no single node is "the" right coordinator. Reads are never eligible
/// either; they take the regular load-balanced path.
pub fn should_apply(mode: AffinityMode, request: &DbRequest) -> bool {
    match mode {
        AffinityMode::Disabled => false,
        AffinityMode::AnyWrite => is_single_item_write(request),
        AffinityMode::ReadModifyWrite => reads_before_write(request),
    }
}

/// Is this a write of exactly one item?
fn is_single_item_write(request: &DbRequest) -> bool {
    matches!(
        request,
        DbRequest::PutItem(_) | DbRequest::UpdateItem(_) | DbRequest::DeleteItem(_)
    )
}

/// Does this write have to read the item's current state before writing?
///
/// True for conditional writes (expression or legacy expected map), for
/// return-value requests that include pre-existing state, and for updates
/// whose ADD/DELETE semantics modify a value in place. A plain unconditional
/// put/delete/update is false.
fn reads_before_write(request: &DbRequest) -> bool {
    match request {
        DbRequest::PutItem(PutItem {
            condition_expression,
            expected,
            return_values,
            ..
        })
        | DbRequest::DeleteItem(DeleteItem {
            condition_expression,
            expected,
            return_values,
            ..
        }) => {
            condition_expression.is_some() || expected.is_some() || return_values.requires_read_back()
        }
        DbRequest::UpdateItem(UpdateItem {
            condition_expression,
            expected,
            return_values,
            update_expression,
            attribute_updates,
            ..
        }) => {
            condition_expression.is_some()
                || expected.is_some()
                || return_values.requires_read_back()
                || update_expression
                    .as_deref()
                    .is_some_and(expression_mutates_in_place)
                || attribute_updates.as_ref().is_some_and(|updates| {
                    updates
                        .values()
                        .any(|u| matches!(u.action, AttributeAction::Add | AttributeAction::Delete))
                })
        }
        _ => false,
    }
}

/// Does an update expression contain an ADD or DELETE clause?
///
/// Clause keywords are case-insensitive and whitespace-delimited. An
/// attribute path that happens to be spelled `add` also matches; the cost of
/// that false positive is one unnecessarily-affine write, which is harmless.
fn expression_mutates_in_place(expression: &str) -> bool {
    expression
        .split_whitespace()
        .any(|token| token.eq_ignore_ascii_case("add") || token.eq_ignore_ascii_case("delete"))
}
