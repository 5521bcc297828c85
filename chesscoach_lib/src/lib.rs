pub mod advisor;
pub mod board;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod hint;
pub mod mistake;
pub mod session;
pub mod skill;
pub mod suggest;
