//! Relay route handlers

pub mod health;
pub mod pacemaker;
pub mod slack;
