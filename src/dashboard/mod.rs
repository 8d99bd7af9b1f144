//! Dashboard state that lives only on this side of the backend

pub mod forms;
pub mod links;

pub use forms::{validate_login, validate_registration, validate_target_url, ValidationError};
pub use links::LinkList;
