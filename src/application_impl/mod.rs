mod session_service_fake;
mod session_service_impl;
mod token_codec_jwt;
mod token_hasher_argon2;

pub use session_service_fake::*;
pub use session_service_impl::*;
pub use token_codec_jwt::*;
pub use token_hasher_argon2::*;
