pub mod get;
pub mod list;
pub mod stats;

pub use get::{GetHashError, GetHashQuery};
pub use list::{ListHashesError, ListHashesQuery, ListHashesResponse};
pub use stats::StatsResponse;
