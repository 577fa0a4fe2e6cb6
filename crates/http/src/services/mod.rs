//! Services for HTTP handlers

pub mod jwt;

pub use jwt::{Audience, Claims, JwtConfig, JwtService, TokenKind};
