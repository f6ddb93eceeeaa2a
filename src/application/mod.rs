//! Application layer: use-case services over the domain traits.

pub mod services;
