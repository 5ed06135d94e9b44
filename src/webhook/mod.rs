//! Map service webhook client
//!
//! Reports a device location through the service's GraphQL endpoint:
//! `POST {url}/graphql` carrying the `Webhook` mutation with category
//! `setLocation` and `[latitude, longitude]` as data.
//!
//! ## How it works:
//! 1. [`request::build`] turns a coordinate into an immutable request
//! 2. [`executor::SubmissionExecutor::submit`] sends it once
//! 3. The response is classified into a [`types::SubmissionOutcome`]
//!
//! Whether and when to try again is up to the caller (see `crate::job`).

pub mod error;
pub mod executor;
pub mod request;
pub mod types;

pub use executor::SubmissionExecutor;
pub use request::build;
pub use types::{Coordinate, SubmissionOutcome};
