pub mod cancel;
pub mod controller;
pub mod mood;
pub mod position;
pub mod presence;
pub mod prompt;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod types;
