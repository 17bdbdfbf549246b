pub mod auth;
pub mod client;
pub mod config;
pub mod controller;
pub mod credits;
pub mod error;
pub mod formatter;
pub mod models;
pub mod repository;
