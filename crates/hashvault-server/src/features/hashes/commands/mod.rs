pub mod create;

pub use create::{CreateHashCommand, CreateHashError};
