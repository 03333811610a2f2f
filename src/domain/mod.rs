mod integrity;
mod record;
mod schema;
mod transfer;

pub use integrity::*;
pub use record::*;
pub use schema::*;
pub use transfer::*;
