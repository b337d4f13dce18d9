//! azure
//!
//! Azure Repos support: organization parsing, OAuth authority discovery,
//! and the durable sign-in cache.
//!
//! # Components
//!
//! - [`org`] - organization derivation from remote URLs
//! - [`authority`] - authority resolution from discovery-probe headers
//! - [`cache`] - the transactional authority/user cache
//!
//! The cache and the Azure Repos provider are wired together by
//! constructor injection at process init; the provider receives an
//! already-constructed cache handle.

pub mod authority;
pub mod cache;
pub mod org;

pub use cache::AzureReposCache;
