mod classify;
mod extractor;
pub mod metadata;
mod types;
mod ytdlp;

pub use classify::UrlClassifier;
pub use extractor::Extractor;
pub use metadata::fetch_metadata;
pub use types::{ByteProgress, ItemFilter, LinkKind, MediaMetadata, Quality, TransferRequest};
pub use ytdlp::YtDlpExtractor;

#[cfg(test)]
pub mod testing;
