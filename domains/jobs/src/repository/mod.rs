//! Repository layer for the Jobs domain

pub mod jobs;

pub use jobs::JobRepository;
