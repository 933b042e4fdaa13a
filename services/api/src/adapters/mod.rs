pub mod db;
pub mod jwt;
pub mod password;

pub use db::DbAdapter;
pub use jwt::JwtTokenService;
pub use password::Argon2Hasher;
