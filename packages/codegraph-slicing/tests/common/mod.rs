//! Shared fixtures and assertions for integration tests

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
