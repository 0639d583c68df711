//! Wire types shared by the Tally API and database layers, plus the
//! expiration arithmetic that every resource response is built from.

pub mod api;
pub mod backup;
pub mod lifecycle;
