pub mod api;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod estimation;
pub mod logger;
pub mod sensor;
pub mod state;
