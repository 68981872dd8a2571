//! Loader services: dependency discovery, platform mapping, rewriting and the
//! load session that composes them.

pub mod definitions;
pub mod flags;
pub mod handlers;
pub mod loader;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod runtime;
pub mod scope;
