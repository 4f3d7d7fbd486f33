//! mongotunnel smoke test
//!
//! Connects to a MongoDB endpoint (usually through the proxy) and, depending
//! on the requested operations, inserts a fixed person twice, queries it back
//! and drops the collection.
//!
//! ```rust,ignore
//! use mongotunnel_tester::{run, MongoPeopleStore, Operation, OperationSet};
//!
//! let store = MongoPeopleStore::connect(&config).await?;
//! let ops: OperationSet = [Operation::Insert, Operation::Query].into_iter().collect();
//! let report = run(&store, &ops, &config).await?;
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod operation;
pub mod person;
pub mod runner;
pub mod store;

pub use operation::{Operation, OperationSet};
pub use person::Person;
pub use runner::{run, RunReport};
pub use store::{InsertReport, MemoryPeopleStore, MongoPeopleStore, PeopleStore};

use thiserror::Error;

/// Smoke test errors
#[derive(Error, Debug)]
pub enum TesterError {
    #[error("Unknown operation {0:?} (expected insert, query or drop)")]
    UnknownOperation(String),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("BSON serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, TesterError>;
