pub mod artifact;
pub mod avi;
pub mod extractor;
pub mod format;
pub mod info;

pub use artifact::VideoArtifact;
pub use avi::AviMainHeader;
pub use extractor::{IngestedVideo, VideoMetadataExtractor};
pub use format::ContainerFormat;
pub use info::VideoInfo;
