//! warden service layer: group, role and user managers, the permission
//! resolver and the endpoint contract that wraps them in result envelopes.
//!
//! Every component is generic over the repository traits in
//! `warden-core`, so nothing here depends on the database crate.

pub mod api;
pub mod catalog;
pub mod config;
pub mod group;
pub mod resolver;
pub mod role;
pub mod title;
pub mod tree;
pub mod user;

pub use api::{AdminApi, MemberInput};
pub use catalog::PermissionCatalog;
pub use config::ServiceConfig;
pub use group::GroupManager;
pub use resolver::PermissionResolver;
pub use role::RoleManager;
pub use title::TitleManager;
pub use tree::{PermissionNode, TreeMode, build_tree};
pub use user::UserManager;
