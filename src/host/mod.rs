//! Reference host: manifest, state store, and the driver that runs the
//! lifecycle hooks over them.

pub mod driver;
pub mod manifest;
pub mod store;
