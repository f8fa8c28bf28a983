//! A normalized cache for GraphQL query results.
//!
//! Responses are described by a [`SelectionSet`] produced ahead of time. Writing a response walks
//! the selection and the data in lock-step, splitting every object into a flat [`store::Record`]
//! addressed by a [`RecordId`]. Objects that share an identity end up in the same record no
//! matter how many queries fetched them. Reading walks the same selection back over the records.
//!
//! The pieces, leaves first:
//!
//! 1. [`selection`]: the shape of a document, its field keys and their declared types.
//! 2. [`scalars`]: custom scalar coercion functions, registered once at start-up.
//! 3. [`coerce`]: applies the scalar functions over a payload, in either direction.
//! 4. [`identity`]: computes the record identifier of an object.
//! 5. [`store`]: the records themselves, written and read through selections.
//! 6. [`gc`]: generation based eviction of records nobody looked at in a while.
//! 7. [`subscriptions`]: which query read which record field, to know who to notify.
//!
//! [`Cache`] puts the store, the subscriptions and the collector behind a lock.

mod cache;
pub mod coerce;
mod error;
pub mod gc;
pub mod identity;
pub mod scalars;
pub mod selection;
pub mod store;
pub mod subscriptions;

pub use self::{
    cache::{Cache, ListHandle, Subscription},
    coerce::Direction,
    error::{CacheError, CacheResult, ValueShape},
    gc::GarbageCollector,
    identity::{IdentityResolver, RecordId},
    scalars::{ScalarDescriptor, ScalarError, ScalarRegistry},
    selection::{Documents, Field, FieldShape, ListInfo, ObjectSelection, OperationKind, SelectionDocument, SelectionSet},
    store::{FieldRef, FieldValue, Link, ListPosition, ReadOutcome, Record, RecordStore, Touched},
    subscriptions::{DependencySet, QueryId, Subscriptions},
};
