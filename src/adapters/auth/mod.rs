//! Session validator adapters.

mod jwt;
mod mock;

pub use jwt::{AccessClaims, Audience, JwtConfig, JwtSessionValidator};
pub use mock::MockSessionValidator;
