//! HTTP handlers module

pub mod health;
pub mod pages;
pub mod results;
pub mod upload;
