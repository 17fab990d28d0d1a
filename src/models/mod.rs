pub mod password_reset;
pub mod pet;
pub mod shelter;
pub mod user;
