pub use campus_models::auth::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse,
};
