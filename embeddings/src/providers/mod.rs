//! Concrete embedding providers.

pub mod local;
pub mod mock;
pub mod remote;
