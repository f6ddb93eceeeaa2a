//! Domain layer: business entities, repository traits, and request scope.

pub mod entities;
pub mod repositories;

mod request_scope;

pub use request_scope::RequestScope;
