//! Remote store backed by the Google Sheets v4 `values` API.
//!
//! Authentication is out of scope: callers hand in a ready bearer token.

pub mod a1;
mod client;
mod error;
mod store;

pub use client::{RequestConfig, SheetsClient};
pub use error::{is_transient_status, Error};
pub use store::SheetsStore;

/// Default base url of the Sheets API.
pub const DEFAULT_API_URL: &str = "https://sheets.googleapis.com";
