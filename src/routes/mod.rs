/// Router Module Index
///
/// Splits the API into the routes anyone may call and the routes that sit
/// behind the auth gate. The gate is applied to the whole authenticated router
/// as a layer, so a handler cannot be mounted there without protection.

/// Read-only catalog routes and the login endpoint.
pub mod public;

/// Write routes. Every request must carry a valid bearer token.
pub mod authenticated;
