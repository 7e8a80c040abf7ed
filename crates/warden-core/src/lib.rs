//! warden core: domain models, repository traits, the error taxonomy and
//! the result envelope shared by every other crate in the workspace.

pub mod error;
pub mod models;
pub mod outcome;
pub mod repository;
