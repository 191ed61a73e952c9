pub mod traits;

// Backend implementations
pub mod rest_api;
pub mod signalr;
