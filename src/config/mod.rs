//! Configuration modules, each loaded from environment variables.
//!
//! - [`token`]: session/reset token lifetimes and signing secret
//! - [`email`]: SMTP settings for reset-token delivery
//! - [`cors`]: allowed origins for the CORS layer

pub mod cors;
pub mod email;
pub mod token;
