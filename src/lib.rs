/// capsule-seal library crate: encryption at rest for capsule content and
/// signed, expiring media links.
///
/// The binary is a thin operator CLI over these modules; integration tests in
/// `tests/` use them directly via `use capsule_seal::...`.
pub mod capsule;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod media;
pub mod release;
pub mod store;
pub mod token;
pub mod util;
