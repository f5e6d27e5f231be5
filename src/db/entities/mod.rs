//! SeaORM entities backing the SQL storage backend.
//!
//! Each table lives in its own module; `prelude` re-exports the entity types
//! under short names for the query code in `db::services`.

pub mod ai_fix;
pub mod monitor;
pub mod monitor_log;
pub mod repository;
pub mod user;

pub mod prelude {
    pub use super::user::Entity as User;
    pub use super::monitor::Entity as Monitor;
    pub use super::monitor_log::Entity as MonitorLog;
    pub use super::ai_fix::Entity as AiFix;
    pub use super::repository::Entity as Repository;
}
