pub mod clock;
pub mod constants;
pub mod engine;
pub mod input;
pub mod rng;
pub mod server_protocol;
pub mod types;
pub mod world;
