//! Async HTTP client for the movie chunk-upload API.
//!
//! [`ApiClient`] speaks the `/api/movies` endpoint family over
//! `reqwest`. The [`MovieApi`] trait abstracts the transport so the
//! upload engine can be driven against mocks in tests.

pub mod api;
pub mod client;

pub use api::{ApiFuture, MovieApi};
pub use client::{ApiClient, Error};
