pub mod abi;
pub mod client;
pub mod rpc;

pub use client::*;
pub use rpc::*;
