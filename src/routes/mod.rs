/// Router Module Index
///
/// Routes are split by access level so authentication is applied once, as a
/// layer on the whole authenticated router, rather than per handler.

/// Routes open to anonymous clients (health, registration, read-only listings).
pub mod public;

/// Routes protected by the `AuthUser` middleware layer.
pub mod authenticated;
