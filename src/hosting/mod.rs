// file: src/hosting/mod.rs
// description: hosting api module exports

pub mod client;

pub use client::{HostingClient, RepoStatus};
