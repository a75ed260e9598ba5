pub mod aggregate;
pub mod cpm;
pub mod fragnet;
pub mod monte_carlo;
pub mod network;
pub mod sampler;
