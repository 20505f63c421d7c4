#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod checkpoint;
pub mod observer;
pub mod page;
pub mod store;
pub mod transaction;

pub use checkpoint::Checkpoint;
pub use observer::{ObserverError, PageObserver};
pub use page::Page;
pub use store::{Commit, CommitStore, StoreError, StoreResult};
pub use transaction::{EventEnvelope, Transaction};
