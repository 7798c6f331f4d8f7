//! REST surface for the excluded UI layer.

mod docs;
mod dto;
mod error;
mod router;
mod routes;
mod state;

pub use error::ServerError;
pub use router::serve;
