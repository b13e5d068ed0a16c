//! Domain model for the Sessions domain

pub mod entities;
pub mod error;
