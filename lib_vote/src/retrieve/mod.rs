//! # Data Retrieval Module
//!
//! HTTP side of the catalog client.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: a generic JSON `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with the credential attached as a default header
//!   and optional retry middleware.
//! - **`catalog`**: `HttpCatalogClient`, the `CatalogClient` implementation
//!   for the image catalog service.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Catalog endpoints on top of `ApiClient`.
pub mod catalog;
/// Generic HTTP API client.
pub mod ky_http;
