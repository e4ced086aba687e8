/// Middleware modules for the web server
///
/// - `session`: restores the caller's session into a request-scoped client
/// - `guard`: access gate per route group

pub mod guard;
pub mod session;
