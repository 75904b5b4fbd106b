//! The request shapes the router can classify and route.
//!
//! [`DbRequest`] is a closed tagged union over the operation kinds the
//! underlying database supports. The router never executes these (the SDK's
//! own pipeline does that); it only inspects them structurally: which table,
//! which key value, and whether the operation's semantics make it eligible
//! for key-based routing (see [`crate::routing::classify`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::{AttrValue, Item};

/// What the caller asked the write to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnValues {
    /// Nothing.
    #[default]
    None,
    /// The entire item as it was before the write.
    AllOld,
    /// Only the updated attributes, as they were before the write.
    UpdatedOld,
    /// The entire item as it is after the write.
    AllNew,
    /// Only the updated attributes, as they are after the write.
    UpdatedNew,
}

impl ReturnValues {
    /// Whether satisfying this request forces the server to read the item's
    /// current state first. `AllNew` qualifies: it returns attributes the
    /// write did not touch. `UpdatedNew` does not: the written values alone
    /// answer it.
    pub fn requires_read_back(self) -> bool {
        matches!(
            self,
            ReturnValues::AllOld | ReturnValues::UpdatedOld | ReturnValues::AllNew
        )
    }
}

/// A legacy conditional-write expectation for one attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpectedAttribute {
    /// Expected current value, if any.
    pub value: Option<AttrValue>,
    /// Expected existence, if the condition is existence-only.
    pub exists: Option<bool>,
}

/// Action of a legacy per-attribute update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeAction {
    /// Replace the attribute.
    Put,
    /// Numeric increment or set-membership addition.
    Add,
    /// Remove the attribute, or remove elements from a set.
    Delete,
}

/// A legacy per-attribute update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub action: AttributeAction,
    pub value: Option<AttrValue>,
}

/// Read a single item by key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetItem {
    pub table_name: String,
    pub key: Item,
}

/// Query items within one partition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryTable {
    pub table_name: String,
    pub key_condition_expression: Option<String>,
}

/// Scan a whole table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanTable {
    pub table_name: String,
}

/// Create or overwrite a single item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PutItem {
    pub table_name: String,
    pub item: Item,
    pub condition_expression: Option<String>,
    /// Legacy conditional map; conditions the write like an expression does.
    pub expected: Option<HashMap<String, ExpectedAttribute>>,
    pub return_values: ReturnValues,
}

/// Update parts of a single item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateItem {
    pub table_name: String,
    pub key: Item,
    pub update_expression: Option<String>,
    /// Legacy per-attribute updates.
    pub attribute_updates: Option<HashMap<String, AttributeUpdate>>,
    pub condition_expression: Option<String>,
    pub expected: Option<HashMap<String, ExpectedAttribute>>,
    pub return_values: ReturnValues,
}

/// Delete a single item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteItem {
    pub table_name: String,
    pub key: Item,
    pub condition_expression: Option<String>,
    pub expected: Option<HashMap<String, ExpectedAttribute>>,
    pub return_values: ReturnValues,
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchWriteOp {
    Put(Item),
    Delete(Item),
}

/// Read many items, possibly across tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchGetItem {
    /// Table name → keys to read.
    pub requests: HashMap<String, Vec<Item>>,
}

/// Write many items, possibly across tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchWriteItem {
    /// Table name → writes.
    pub requests: HashMap<String, Vec<BatchWriteOp>>,
}

/// A request the router can inspect.
///
/// The set is closed: one variant per supported operation kind, with pure
/// structural accessors below instead of runtime type inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DbRequest {
    GetItem(GetItem),
    Query(QueryTable),
    Scan(ScanTable),
    PutItem(PutItem),
    UpdateItem(UpdateItem),
    DeleteItem(DeleteItem),
    BatchGetItem(BatchGetItem),
    BatchWriteItem(BatchWriteItem),
}

impl DbRequest {
    /// The single table this request addresses, or `None` for batch
    /// operations (which may span tables and carry several partition keys).
    pub fn table_name(&self) -> Option<&str> {
        match self {
            DbRequest::GetItem(r) => Some(&r.table_name),
            DbRequest::Query(r) => Some(&r.table_name),
            DbRequest::Scan(r) => Some(&r.table_name),
            DbRequest::PutItem(r) => Some(&r.table_name),
            DbRequest::UpdateItem(r) => Some(&r.table_name),
            DbRequest::DeleteItem(r) => Some(&r.table_name),
            DbRequest::BatchGetItem(_) | DbRequest::BatchWriteItem(_) => None,
        }
    }

    /// The attribute map that carries the item's key, if the operation has
    /// one: the full item for puts, the key map for keyed reads and writes.
    pub fn key_attributes(&self) -> Option<&Item> {
        match self {
            DbRequest::GetItem(r) => Some(&r.key),
            DbRequest::PutItem(r) => Some(&r.item),
            DbRequest::UpdateItem(r) => Some(&r.key),
            DbRequest::DeleteItem(r) => Some(&r.key),
            DbRequest::Query(_)
            | DbRequest::Scan(_)
            | DbRequest::BatchGetItem(_)
            | DbRequest::BatchWriteItem(_) => None,
        }
    }

    /// The partition-key value for `key_name`, when present.
    pub fn partition_key_value(&self, key_name: &str) -> Option<&AttrValue> {
        self.key_attributes().and_then(|attrs| attrs.get(key_name))
    }

    /// Short operation name for logs.
    pub fn operation_name(&self) -> &'static str {
        match self {
            DbRequest::GetItem(_) => "GetItem",
            DbRequest::Query(_) => "Query",
            DbRequest::Scan(_) => "Scan",
            DbRequest::PutItem(_) => "PutItem",
            DbRequest::UpdateItem(_) => "UpdateItem",
            DbRequest::DeleteItem(_) => "DeleteItem",
            DbRequest::BatchGetItem(_) => "BatchGetItem",
            DbRequest::BatchWriteItem(_) => "BatchWriteItem",
        }
    }
}
