//! Shared utilities and configuration for Atelier
//!
//! This crate provides common functionality used across the Atelier workspace:
//! - Configuration management following 12-factor principles
//! - Lossless binary-to-text conversion for persisted and exported payloads
//! - Credential storage with reversible obfuscation

pub mod codec;
pub mod config;
pub mod credentials;
pub mod crypto;

pub use codec::{decode_blob, encode_blob, CodecError};
pub use config::Config;
pub use credentials::{CredentialStore, InMemoryCredentialStore, ObfuscatedCredentials};
pub use crypto::{obfuscate, reveal, session_salt};
