pub mod analyze;
pub mod config;
pub mod dispatch;
pub mod run;
pub mod status;
pub mod store;
pub mod sync;
