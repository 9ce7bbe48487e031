//! Identity, timestamps and optimistic version shared by every aggregate root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn from_uuid(id: Uuid) -> Self { Self(id) }
            pub fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl Default for $name {
            fn default() -> Self { Self::new() }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { std::fmt::Display::fmt(&self.0, f) }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
        }
    };
}

entity_id!(
    /// Buyer account id
    UserId
);
entity_id!(
    /// Seller account id
    MerchantId
);
entity_id!(
    /// Catalog entry id
    ProductId
);
entity_id!(
    /// Order id
    OrderId
);

/// Embedded in each aggregate root. Version 0 means never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateMeta<Id> {
    pub id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl<Id> AggregateMeta<Id> {
    pub fn new(id: Id) -> Self {
        let now = Utc::now();
        Self { id, created_at: now, updated_at: now, version: 0 }
    }

    /// Rebuild from persisted columns.
    pub fn restore(id: Id, created_at: DateTime<Utc>, updated_at: DateTime<Utc>, version: i64) -> Self {
        Self { id, created_at, updated_at, version }
    }

    pub fn is_new(&self) -> bool { self.version == 0 }

    /// Stamp a successful store write: inserts set both timestamps, updates only `updated_at`.
    pub fn record_write(&mut self, now: DateTime<Utc>) {
        if self.is_new() { self.created_at = now; }
        self.updated_at = now;
        self.version += 1;
    }
}
