//! Transaction building and signing
//!
//! Build an unsigned [`Template`] with the [`Builder`], collect signatures
//! with [`sign`] (possibly across several parties via JSON), then finalize
//! it with [`Template::into_transaction`].

pub mod builder;
pub mod signing;
pub mod template;

pub use builder::Builder;
pub use signing::{sign, sign_progress, KeyId, SignContext, SigningInstruction, XPub};
pub use template::Template;
