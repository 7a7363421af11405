//! Core types, trait definitions, and workflows for the Muster membership
//! service.
//!
//! This crate is free of HTTP, image, and database dependencies. Storage is
//! reached through [`store::MemberStore`]; password hashing and outbound
//! notifications through the seams in [`registration`].

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures where they matter.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod identity;
pub mod lookup;
pub mod moderation;
pub mod registration;
pub mod role;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
pub use identity::AuthContext;

#[cfg(test)]
mod testing;
