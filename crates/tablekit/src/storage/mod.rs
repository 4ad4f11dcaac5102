//! Store adapters implementing [`tablekit_core::storage::KeyValueStore`].
//!
//! Adapters are selected at compile time via feature flags and may be
//! enabled together.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): in-process tables for tests and local development
//! - `dynamodb`: AWS DynamoDB using `aws-sdk-dynamodb`
//!
//! Build the CLI against DynamoDB:
//! ```bash
//! cargo build -p tablekit --features dynamodb
//! ```

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;
