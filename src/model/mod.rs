pub mod common;
pub mod model_term;
pub mod query;
pub mod term;
pub mod user_context;
pub mod vocabulary;

pub use common::*;
pub use model_term::*;
pub use query::*;
pub use term::*;
pub use user_context::*;
pub use vocabulary::*;
