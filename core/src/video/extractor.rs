use crate::prelude::{VarError, VarResult};
use crate::telemetry::LogManager;
use crate::video::artifact::VideoArtifact;
use crate::video::avi::AviMainHeader;
use crate::video::format::ContainerFormat;
use crate::video::info::VideoInfo;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

/// Metadata plus the session-owned copy of an accepted upload.
#[derive(Debug)]
pub struct IngestedVideo {
    pub info: VideoInfo,
    pub artifact: VideoArtifact,
}

/// Reads container-level stream properties from uploaded bytes.
pub struct VideoMetadataExtractor {
    temp_dir: Option<PathBuf>,
    logger: LogManager,
}

impl VideoMetadataExtractor {
    pub fn new() -> Self {
        Self {
            temp_dir: None,
            logger: LogManager::new("extractor"),
        }
    }

    pub fn with_temp_dir(dir: PathBuf) -> Self {
        Self {
            temp_dir: Some(dir),
            ..Self::new()
        }
    }

    /// Checks the allow-list, reads the metadata and persists the bytes.
    ///
    /// Nothing is written to disk unless both the extension and the
    /// container are accepted.
    pub fn ingest(&self, filename: &str, bytes: &[u8]) -> VarResult<IngestedVideo> {
        let format = ContainerFormat::from_filename(filename)?;
        let info = self.extract(bytes, format)?;
        let artifact = VideoArtifact::persist(bytes, format, self.temp_dir.as_deref())?;
        self.logger.record(&format!(
            "{} -> {} frames @ {:.2} fps, {}",
            filename,
            info.frame_count,
            info.frame_rate,
            info.resolution()
        ));
        Ok(IngestedVideo { info, artifact })
    }

    /// Missing stream properties come back as zeroes; only a container that
    /// cannot be opened at all is an error.
    pub fn extract(&self, bytes: &[u8], format: ContainerFormat) -> VarResult<VideoInfo> {
        if bytes.is_empty() {
            return Err(VarError::UnreadableVideo("empty upload".into()));
        }
        let info = match format {
            ContainerFormat::Mp4 | ContainerFormat::Mov => read_iso_media(bytes)?,
            ContainerFormat::Avi => match AviMainHeader::parse(bytes)? {
                Some(header) => VideoInfo::new(
                    header.total_frames as u64,
                    header.frame_rate(),
                    header.width,
                    header.height,
                ),
                None => VideoInfo::unavailable(),
            },
        };
        if info.frame_count == 0 || info.frame_rate == 0.0 {
            self.logger
                .warn("container reported no frame rate or frame count; using zeroes");
        }
        Ok(info)
    }
}

impl Default for VideoMetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn read_iso_media(bytes: &[u8]) -> VarResult<VideoInfo> {
    let reader = mp4::Mp4Reader::read_header(Cursor::new(bytes), bytes.len() as u64)
        .map_err(|err| VarError::UnreadableVideo(err.to_string()))?;

    let video_track = reader
        .tracks()
        .iter()
        .filter(|(_, track)| matches!(track.track_type(), Ok(mp4::TrackType::Video)))
        .min_by_key(|(id, _)| **id)
        .map(|(_, track)| track);

    Ok(match video_track {
        Some(track) => VideoInfo::new(
            track.sample_count() as u64,
            sample_rate(track.sample_count(), track.duration()),
            track.width() as u32,
            track.height() as u32,
        ),
        None => VideoInfo::unavailable(),
    })
}

// `Mp4Track::frame_rate` truncates to whole frames, so NTSC rates are
// derived from the media duration instead.
fn sample_rate(samples: u32, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        samples as f64 / seconds
    } else {
        0.0
    }
}
