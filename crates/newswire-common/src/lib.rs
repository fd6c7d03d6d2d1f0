//! Newswire Common Library
//!
//! Shared plumbing for the newswire workspace members:
//!
//! - **Fingerprints**: stable hashing of query parameters, used as the key
//!   for the result cache and the incremental fetch ledger
//! - **Logging**: tracing subscriber configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use newswire_common::fingerprint::fingerprint;
//!
//! let fp = fingerprint(&[
//!     ("feed", "events-v2".to_string()),
//!     ("start", "20210101000000".to_string()),
//! ]);
//! println!("query fingerprint: {}", fp);
//! ```

pub mod fingerprint;
pub mod logging;
