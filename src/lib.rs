pub mod app;
pub mod auth;
pub mod browser;
pub mod config;
pub mod db;
pub mod error;
pub mod movies;
pub mod state;
