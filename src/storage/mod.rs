mod repository;
mod statements;

pub use repository::*;
pub use statements::Statements;
