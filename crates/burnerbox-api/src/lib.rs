//! # burnerbox-api
//!
//! HTTP client for the disposable-mail REST API.
//!
//! The API exposes two endpoints:
//!
//! - `GET /api/emails/{address}` — current snapshot of an inbox as a JSON
//!   array. An empty array and a 404 both mean "no messages".
//! - `GET /api/generate_email` — mints a fresh throwaway address.
//!
//! The server is loose about field names (`from` vs `sender`, `body` vs
//! `message`) and may omit fields entirely, so the wire model in [`model`]
//! accepts all observed variants. Callers normalize [`RawMessage`] into
//! their own canonical shape before doing anything with it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod model;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use model::{GeneratedAddress, RawAttachment, RawMessage};
