//! # DynamoDB Module
//!
//! Backing storage for the items collection.
//!
//! ## Components
//!
//! - `DynamoDb`: A client wrapper for the put/get/delete/scan operations.
//! - `Item`: An open-schema document with a mandatory string `id`.
//! - `Table`: The items table and its partition key.
//!
//! ## Usage
//!
//! The client reads its settings from the standard AWS environment:
//!
//! - `AWS_ACCESS_KEY_ID`: Your AWS access key ID.
//! - `AWS_SECRET_ACCESS_KEY`: Your AWS secret access key.
//! - `AWS_REGION`: The AWS region where your DynamoDB tables are located.
//!
//! Optionally, you can also set:
//! - `AWS_SESSION_TOKEN`: If you're using temporary credentials.
//! - `AWS_ENDPOINT_URL`: For using a custom endpoint (e.g., DynamoDB Local).

mod client;
mod item;
mod table;

pub use client::DynamoDb;
pub use item::{Item, ID_FIELD};
pub use table::Table;
