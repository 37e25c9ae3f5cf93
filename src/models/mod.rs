mod audit_log;
mod project;
mod project_member;
mod user;

pub use audit_log::*;
pub use project::*;
pub use project_member::*;
pub use user::*;
