//! 领域层

pub mod api_resource;
pub mod identity_resource;
pub mod role_view;
pub mod unit_of_work;
