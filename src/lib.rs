// termfolio library - exposes the session core and the SSH glue for testing

pub mod app;
pub mod config;
pub mod content;
pub mod input;
pub mod services;
pub mod view;
