pub mod auth_service;
pub mod checker;
pub mod encryption_service;
pub mod fix_generator;
pub mod fix_service;
pub mod monitor_service;
pub mod repository_service;
