// Shiftbook API Library
// Decision: Shared library for the server binary and router-level tests

// Router composition
pub mod api;

// Authentication module
pub mod auth;
