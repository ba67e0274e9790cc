//! # Item Registry
//!
//! Item identity and status. Items are created by their first request, are
//! indexed by a payload-derived key so the same payload always resolves to
//! the same item, and are never removed: `Absent` is a status, not a
//! deletion.
//!
//! ## State machine
//!
//! ```text
//! Absent ──request──▶ Requested(Registration) ──accepted──▶ Registered
//!    ▲                        │ refused                          │
//!    │                        ▼                                  │
//!    │                     Absent                        request │
//!    │                                                           ▼
//!    └──────────accepted────────────── Requested(Clearing) ◀─────┘
//!                                             │ refused
//!                                             ▼
//!                                         Registered
//! ```
//!
//! At most one request is active per item. The registry only records
//! transitions; the engine decides when they happen.

use std::collections::BTreeMap;
use std::fmt::Debug;

use arbitrable_core::{IdAllocator, ItemId, RequestId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;
use crate::request::RequestKind;

/// Status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Not in the registry.
    Absent,
    /// A request to change the status is pending.
    Requested(RequestKind),
    /// In the registry.
    Registered,
}

impl ItemStatus {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "ABSENT",
            Self::Requested(RequestKind::Registration) => "REGISTRATION_REQUESTED",
            Self::Requested(RequestKind::Clearing) => "CLEARING_REQUESTED",
            Self::Registered => "REGISTERED",
        }
    }

    /// Whether a request is pending.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Requested(_))
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payload rejected by its domain's validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct PayloadError {
    /// The offending field.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl PayloadError {
    /// Create a payload error.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Domain data carried by an item.
///
/// The engine never interprets a payload beyond [`key`](Self::key) and
/// [`validate`](Self::validate).
pub trait ItemPayload: Clone + Debug + Serialize + DeserializeOwned + Send + 'static {
    /// Stable identity of the payload. Two payloads with the same key are
    /// the same item.
    fn key(&self) -> String;

    /// Reject malformed payloads before any request is opened.
    fn validate(&self) -> Result<(), PayloadError>;
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "P: ItemPayload")]
pub struct Item<P> {
    id: ItemId,
    key: String,
    payload: P,
    status: ItemStatus,
    requests: Vec<RequestId>,
    active: Option<RequestId>,
}

impl<P: ItemPayload> Item<P> {
    /// The item identifier.
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// The payload-derived key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The domain payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Current status.
    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Every request ever made on this item, oldest first.
    pub fn requests(&self) -> &[RequestId] {
        &self.requests
    }

    /// The unresolved request, if any.
    pub fn active_request(&self) -> Option<RequestId> {
        self.active
    }
}

/// One page of an item listing.
#[derive(Debug)]
pub struct ItemPage<'a, P> {
    /// Items on this page, in identifier order.
    pub items: Vec<&'a Item<P>>,
    /// Pass as `after` to fetch the next page; `None` on the last page.
    pub next_cursor: Option<ItemId>,
}

/// Arena of items plus the key index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "P: ItemPayload")]
pub struct ItemRegistry<P> {
    items: BTreeMap<ItemId, Item<P>>,
    by_key: BTreeMap<String, ItemId>,
    ids: IdAllocator<ItemId>,
}

impl<P> ItemRegistry<P> {
    /// Number of items ever created.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item was ever created.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<P: ItemPayload> Default for ItemRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ItemPayload> ItemRegistry<P> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            by_key: BTreeMap::new(),
            ids: IdAllocator::new(),
        }
    }

    /// An item by identifier.
    pub fn get(&self, id: ItemId) -> Option<&Item<P>> {
        self.items.get(&id)
    }

    /// An item by payload key.
    pub fn by_key(&self, key: &str) -> Option<&Item<P>> {
        self.by_key.get(key).and_then(|id| self.items.get(id))
    }

    /// List items with identifiers greater than `after`, optionally
    /// filtered by status, at most `limit` per page.
    pub fn list(
        &self,
        status: Option<ItemStatus>,
        after: Option<ItemId>,
        limit: usize,
    ) -> ItemPage<'_, P> {
        let start = after.map_or(0, |id| id.get().saturating_add(1));
        let mut matching = self
            .items
            .range(ItemId::new(start)..)
            .map(|(_, item)| item)
            .filter(|item| status.map_or(true, |s| item.status == s));
        let items: Vec<&Item<P>> = matching.by_ref().take(limit).collect();
        let next_cursor = match (items.last(), matching.next()) {
            (Some(last), Some(_)) => Some(last.id),
            _ => None,
        };
        ItemPage { items, next_cursor }
    }

    /// The kind of request an item currently admits.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`] for an unknown item and
    /// [`EngineError::InvalidState`] if a request is already pending.
    pub fn admit_request(&self, id: ItemId) -> Result<RequestKind, EngineError> {
        let item = self
            .items
            .get(&id)
            .ok_or_else(|| EngineError::unknown("item", id))?;
        match item.status {
            ItemStatus::Absent => Ok(RequestKind::Registration),
            ItemStatus::Registered => Ok(RequestKind::Clearing),
            ItemStatus::Requested(_) => Err(EngineError::invalid_state(
                "request_status_change",
                format!("{id} already has an active request"),
            )),
        }
    }

    /// Create an `Absent` item.
    pub(crate) fn insert(&mut self, key: String, payload: P) -> ItemId {
        let id = self.ids.allocate();
        self.by_key.insert(key.clone(), id);
        self.items.insert(
            id,
            Item {
                id,
                key,
                payload,
                status: ItemStatus::Absent,
                requests: Vec::new(),
                active: None,
            },
        );
        id
    }

    /// Mark `request` as the item's active request.
    pub(crate) fn begin_request(&mut self, id: ItemId, request: RequestId, kind: RequestKind) {
        if let Some(item) = self.items.get_mut(&id) {
            item.status = ItemStatus::Requested(kind);
            item.requests.push(request);
            item.active = Some(request);
        }
    }

    /// Close the active request and set the resulting status. Returns the
    /// status the item had before.
    pub(crate) fn finish_request(&mut self, id: ItemId, status: ItemStatus) -> Option<ItemStatus> {
        let item = self.items.get_mut(&id)?;
        let previous = item.status;
        item.status = status;
        item.active = None;
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Name(String);

    impl ItemPayload for Name {
        fn key(&self) -> String {
            self.0.to_lowercase()
        }

        fn validate(&self) -> Result<(), PayloadError> {
            if self.0.is_empty() {
                return Err(PayloadError::new("name", "must not be empty"));
            }
            Ok(())
        }
    }

    fn registry_with(n: usize) -> ItemRegistry<Name> {
        let mut registry = ItemRegistry::new();
        for i in 0..n {
            let name = Name(format!("n{i}"));
            registry.insert(name.key(), name);
        }
        registry
    }

    #[test]
    fn key_index_resolves_same_item() {
        let registry = registry_with(1);
        let item = registry.by_key("n0").unwrap();
        assert_eq!(item.id(), ItemId::new(0));
        assert_eq!(item.status(), ItemStatus::Absent);
    }

    #[test]
    fn admits_one_request_at_a_time() {
        let mut registry = registry_with(1);
        let id = ItemId::new(0);
        assert_eq!(registry.admit_request(id).unwrap(), RequestKind::Registration);
        registry.begin_request(id, RequestId::new(0), RequestKind::Registration);
        assert!(matches!(
            registry.admit_request(id),
            Err(EngineError::InvalidState { .. })
        ));
        let prev = registry.finish_request(id, ItemStatus::Registered);
        assert_eq!(prev, Some(ItemStatus::Requested(RequestKind::Registration)));
        assert_eq!(registry.admit_request(id).unwrap(), RequestKind::Clearing);
        assert_eq!(registry.get(id).unwrap().requests(), &[RequestId::new(0)]);
    }

    #[test]
    fn unknown_item_is_rejected() {
        let registry = registry_with(0);
        assert!(matches!(
            registry.admit_request(ItemId::new(4)),
            Err(EngineError::UnknownId { .. })
        ));
    }

    #[test]
    fn list_paginates_with_cursor() {
        let registry = registry_with(5);
        let first = registry.list(None, None, 2);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_cursor, Some(ItemId::new(1)));
        let second = registry.list(None, first.next_cursor, 2);
        assert_eq!(second.items[0].id(), ItemId::new(2));
        let last = registry.list(None, Some(ItemId::new(3)), 2);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_cursor, None);
    }

    #[test]
    fn list_filters_by_status() {
        let mut registry = registry_with(3);
        registry.begin_request(ItemId::new(1), RequestId::new(0), RequestKind::Registration);
        registry.finish_request(ItemId::new(1), ItemStatus::Registered);
        let page = registry.list(Some(ItemStatus::Registered), None, 10);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), ItemId::new(1));
    }

    #[test]
    fn payload_error_display() {
        let err = Name(String::new()).validate().unwrap_err();
        assert_eq!(err.to_string(), "name: must not be empty");
    }
}
