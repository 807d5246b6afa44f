// Library target so integration tests can drive the app through
// `recdeck::app::App`; the binary entry point is main.rs.
pub mod app;
pub mod config;
pub mod data;
pub mod focus;
pub mod ui;
