pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{CreateHashCommand, CreateHashError};
pub use queries::{
    GetHashError, GetHashQuery, ListHashesError, ListHashesQuery, ListHashesResponse,
    StatsResponse,
};
pub use routes::{hashes_routes, stats_routes};
