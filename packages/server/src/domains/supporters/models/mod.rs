pub mod user;

pub use user::{Privileges, User};
