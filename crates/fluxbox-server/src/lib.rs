pub mod accounts;
pub mod admission;
pub mod app;
pub mod auth;
pub mod error;
pub mod payments;
pub mod routes;
pub mod state;
