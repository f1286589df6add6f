pub mod api;
pub mod auth;
pub mod client;

pub use api::ApiAdapter;
pub use client::{HttpClient, Method};
