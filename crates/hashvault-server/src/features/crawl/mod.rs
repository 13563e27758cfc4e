pub mod routes;

pub use routes::crawl_routes;
