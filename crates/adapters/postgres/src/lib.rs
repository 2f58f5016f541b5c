//! idconf-adapter-postgres - PostgreSQL 适配器

mod connection;
mod health;
mod migration;
mod transaction;

pub use connection::*;
pub use health::*;
pub use migration::*;
pub use transaction::*;
