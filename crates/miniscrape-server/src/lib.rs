//! HTTP API server: routes, admin authentication and DTOs.

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;
