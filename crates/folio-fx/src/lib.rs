pub mod app;
pub mod controllers;

pub use app::{default_controllers, App, ControllerEntry, StartupFailure, StartupReport};
pub use controllers::Controller;
