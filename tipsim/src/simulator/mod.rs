pub mod issuer;
pub mod network;
pub mod tangle;
