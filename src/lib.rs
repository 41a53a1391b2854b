pub mod api;
pub mod config;
pub mod crypto;
pub mod humanize;
pub mod media;
pub mod observability;
pub mod origin;
pub mod pipeline;
pub mod response;
