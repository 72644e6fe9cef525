//! HTTP handlers for pos-service.

pub mod auth;
pub mod bills;
pub mod export;
pub mod health;
pub mod menu;
pub mod shop;
