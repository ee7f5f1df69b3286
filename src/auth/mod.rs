pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::AuthUser;
pub use token::{Claims, TokenService};
