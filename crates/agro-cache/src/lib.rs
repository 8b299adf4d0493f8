#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/agroconnect/agro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Retrieval cache for AgroConnect providers.
//!
//! - [`InMemoryCache`] - Time-windowed, process-local memoization map

/// In-memory cache implementation.
pub mod memory;

pub use memory::InMemoryCache;
