//! Domain models for warden.
//!
//! Users, groups and roles are owned by their managers; membership rows by
//! the membership store; resource nodes and grants by the permission
//! catalog, which this core only reads during resolution.

pub mod group;
pub mod resource;
pub mod role;
pub mod title;
pub mod user;
