//! Hashvault Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Hashvault project.
//!
//! # Overview
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Types**: Validated hash tokens shared by the crawler and the API
//!
//! # Example
//!
//! ```
//! use hashvault_common::types::Md5Hash;
//!
//! let hash = Md5Hash::parse("D41D8CD98F00B204E9800998ECF8427E").unwrap();
//! assert_eq!(hash.as_str(), "d41d8cd98f00b204e9800998ecf8427e");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{HashvaultError, Result};
pub use types::Md5Hash;
