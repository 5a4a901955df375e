// Shared test fixtures, compiled into the crate only under cfg(test).

pub mod observer;
pub mod publisher;
