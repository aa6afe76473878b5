/// Authentication module
///
/// Session/token lifecycle: signed-token codec, refresh-token store and
/// rotation, password hashing, and the password-reset flow.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod reset;
mod session;

pub use claims::Claims;
pub use claims::TokenPurpose;
pub use jwt::authenticate;
pub use jwt::decode_token;
pub use jwt::encode_claims;
pub use jwt::generate_access_token;
pub use jwt::generate_reset_token;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::hash_token;
pub use refresh_token::InMemoryRefreshTokenStore;
pub use refresh_token::PgRefreshTokenStore;
pub use refresh_token::RefreshTokenRecord;
pub use refresh_token::RefreshTokenStore;
pub use reset::redeem_reset;
pub use reset::request_reset;
pub use session::issue_session;
pub use session::refresh_session;
pub use session::revoke_session;
pub use session::SessionTokens;
