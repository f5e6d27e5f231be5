pub mod ai_routes;
pub mod auth_routes;
pub mod health_routes;
pub mod monitor_routes;
pub mod repository_routes;

#[cfg(test)]
mod tests;
