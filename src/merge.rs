//! Per-field merge policies for cached GraphQL payloads.
//!
//! A policy owns one field of a response, located by JSON pointer, and
//! decides how an incoming value for that field combines with the value
//! already cached under the same key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Request arguments a merge function may look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeArgs {
    /// The `after` cursor the page was requested with.
    pub cursor: Option<String>,
}

impl MergeArgs {
    pub fn after(cursor: Option<String>) -> Self {
        Self { cursor }
    }
}

/// Whether the cursor argument takes part in the field's cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKey {
    /// Every page is cached under its own key.
    Included,
    /// Pages share one key and accumulate.
    Excluded,
}

/// What a merge function sees besides the two values.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub cursor: Option<&'a str>,
    pub cursor_key: CursorKey,
}

pub type MergeFn = Arc<dyn Fn(Option<&Value>, Value, &MergeContext<'_>) -> Value + Send + Sync>;

/// Identifies a field on a GraphQL type, e.g. `Repository.issues`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub typename: &'static str,
    pub field: &'static str,
}

impl FieldRef {
    pub const fn new(typename: &'static str, field: &'static str) -> Self {
        Self { typename, field }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.typename, self.field)
    }
}

#[derive(Clone)]
pub struct FieldPolicy {
    pointer: String,
    cursor_key: CursorKey,
    merge: MergeFn,
}

impl FieldPolicy {
    pub fn new(pointer: impl Into<String>, cursor_key: CursorKey, merge: MergeFn) -> Self {
        Self {
            pointer: pointer.into(),
            cursor_key,
            merge,
        }
    }

    /// The built-in replace policy.
    pub fn replace(pointer: impl Into<String>, cursor_key: CursorKey) -> Self {
        Self::new(pointer, cursor_key, Arc::new(replace))
    }
}

impl fmt::Debug for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPolicy")
            .field("pointer", &self.pointer)
            .field("cursor_key", &self.cursor_key)
            .finish_non_exhaustive()
    }
}

/// Replace the cached value with the incoming one.
///
/// When the cursor is excluded from the key the field accumulates instead:
/// the first page replaces, later pages append their nodes.
pub fn replace(existing: Option<&Value>, incoming: Value, ctx: &MergeContext<'_>) -> Value {
    match ctx.cursor_key {
        CursorKey::Included => incoming,
        CursorKey::Excluded => append(existing, incoming, ctx),
    }
}

/// Concatenate `existing.nodes ++ incoming.nodes` unless this is a first
/// page. All other fields come from `incoming`.
pub fn append(existing: Option<&Value>, mut incoming: Value, ctx: &MergeContext<'_>) -> Value {
    if ctx.cursor.is_none() {
        return incoming;
    }

    let Some(previous) = existing
        .and_then(|e| e.get("nodes"))
        .and_then(Value::as_array)
    else {
        return incoming;
    };

    if let Some(nodes) = incoming.get_mut("nodes").and_then(Value::as_array_mut) {
        let mut combined = previous.clone();
        combined.append(nodes);
        *nodes = combined;
    }

    incoming
}

/// Table of field policies consulted on every cache write.
#[derive(Debug, Clone, Default)]
pub struct MergeRegistry {
    policies: HashMap<FieldRef, FieldPolicy>,
}

impl MergeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policies for the GitHub queries this application issues.
    pub fn github() -> Self {
        let mut registry = Self::new();
        registry.register(
            FieldRef::new("Query", "search"),
            FieldPolicy::replace("/search", CursorKey::Included),
        );
        registry.register(
            FieldRef::new("Repository", "issues"),
            FieldPolicy::replace("/repository/issues", CursorKey::Included),
        );
        registry.register(
            FieldRef::new("Issue", "comments"),
            FieldPolicy::replace("/repository/issue/comments", CursorKey::Excluded),
        );
        registry
    }

    pub fn register(&mut self, field: FieldRef, policy: FieldPolicy) -> &mut Self {
        self.policies.insert(field, policy);
        self
    }

    /// Compute the payload to store for an incoming response.
    ///
    /// Fields without a policy are taken from `incoming` as-is.
    pub fn apply(&self, existing: Option<&Value>, incoming: Value, args: &MergeArgs) -> Value {
        let mut result = incoming;
        for (field, policy) in &self.policies {
            let Some(slot) = result.pointer_mut(&policy.pointer) else {
                continue;
            };
            let ctx = MergeContext {
                cursor: args.cursor.as_deref(),
                cursor_key: policy.cursor_key,
            };
            let previous = existing.and_then(|e| e.pointer(&policy.pointer));
            tracing::trace!(%field, cursor = ?ctx.cursor, "applying merge policy");
            *slot = (policy.merge)(previous, slot.take(), &ctx);
        }
        result
    }
}
