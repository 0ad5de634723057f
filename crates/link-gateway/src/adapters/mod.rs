//! Adapters implementing the gateway's outbound ports.

pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;
