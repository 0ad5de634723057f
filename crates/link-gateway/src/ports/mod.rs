//! Ports (hexagonal boundaries) for the link gateway.

pub mod outbound;

pub use outbound::LinkExtractor;
