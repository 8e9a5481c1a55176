//! Authentication for bank staff and clients
//!
//! - Login/password accounts with bcrypt hashes
//! - Stateless HS256 JWT access tokens
//! - Employee registration and first-admin bootstrap

mod jwt;
mod password;
mod service;

pub use jwt::{generate_token, verify_token, Claims, JwtError};
pub use password::{generate_password, hash_password, verify_password};
pub(crate) use service::insert_user;
pub use service::{
    AuthError, AuthService, EmployeeCreated, LoginRequest, LoginResponse, LoginUser,
    RegisterEmployeeRequest,
};
