//! RAOP (`AirPlay` 1) protocol implementation

mod auth;

pub use auth::{
    CHALLENGE_SIZE, build_signed_buffer, decode_challenge, sign_challenge,
};
