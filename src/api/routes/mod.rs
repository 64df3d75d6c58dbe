pub mod downtime;
pub mod health;
pub mod monitors;
pub mod users;
