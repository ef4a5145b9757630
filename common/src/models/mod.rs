pub mod credential;
pub mod user;

pub use credential::*;
pub use user::*;
