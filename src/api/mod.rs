pub mod access;
pub mod handlers;
pub mod routes;
pub mod teaser;
pub mod user_extractor;

pub use access::*;
pub use handlers::*;
pub use routes::*;
pub use teaser::*;
