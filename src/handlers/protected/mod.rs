// Handlers behind jwt_auth_middleware; each receives the caller as Extension<AuthUser>
pub mod auth;
pub mod todos;
