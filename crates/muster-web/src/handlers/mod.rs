pub mod card;
pub mod members;
pub mod public;
pub mod session;
pub mod signup;
