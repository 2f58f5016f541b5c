//! idconf-domain-core - 跨模块共享的领域核心类型
//!
//! 实体基础 trait 与树形实体视图模型

mod entity;
mod tree;

pub use entity::*;
pub use tree::*;

// Re-export common types
pub use idconf_common::{AuditInfo, UserId};
