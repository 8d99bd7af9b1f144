pub mod link;

pub use link::{CreateLinkRequest, LoginResponse, Link, RegisterRequest, User};
