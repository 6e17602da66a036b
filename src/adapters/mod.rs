//! Adapters implementing the collaborator ports.

pub mod live;
pub mod scripted;
