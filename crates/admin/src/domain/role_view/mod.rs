//! 层级角色视图领域模块

pub mod repository;
pub mod view;

pub use repository::RoleViewRepository;
pub use view::{RoleId, RoleView, normalize_name};
