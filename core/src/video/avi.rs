use crate::prelude::{VarError, VarResult};

const MAIN_HEADER_LEN: usize = 56;

/// Fields of the RIFF `avih` main header that describe the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AviMainHeader {
    pub micro_sec_per_frame: u32,
    pub total_frames: u32,
    pub width: u32,
    pub height: u32,
}

impl AviMainHeader {
    /// Parses an AVI byte stream.
    ///
    /// Returns `Ok(None)` when the RIFF/AVI signature is present but no main
    /// header can be found, so the caller can fall back to zeroed metadata.
    pub fn parse(bytes: &[u8]) -> VarResult<Option<Self>> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"AVI " {
            return Err(VarError::UnreadableVideo(
                "missing RIFF/AVI signature".into(),
            ));
        }
        Ok(find_main_header(&bytes[12..]))
    }

    pub fn frame_rate(&self) -> f64 {
        if self.micro_sec_per_frame == 0 {
            0.0
        } else {
            1_000_000.0 / self.micro_sec_per_frame as f64
        }
    }

    /// Serializes a minimal AVI file: the `hdrl` list with this header,
    /// followed by a `movi` list wrapping `payload`.
    pub fn encode_clip(&self, payload: &[u8]) -> Vec<u8> {
        let mut avih = Vec::with_capacity(MAIN_HEADER_LEN);
        for field in [
            self.micro_sec_per_frame,
            0,
            0,
            0,
            self.total_frames,
            0,
            1,
            0,
            self.width,
            self.height,
        ] {
            avih.extend_from_slice(&field.to_le_bytes());
        }
        avih.resize(MAIN_HEADER_LEN, 0);

        let mut hdrl = b"hdrl".to_vec();
        push_chunk(&mut hdrl, b"avih", &avih);

        let mut movi = b"movi".to_vec();
        push_chunk(&mut movi, b"00dc", payload);

        let mut body = b"AVI ".to_vec();
        push_chunk(&mut body, b"LIST", &hdrl);
        push_chunk(&mut body, b"LIST", &movi);

        let mut riff = Vec::with_capacity(body.len() + 8);
        push_chunk(&mut riff, b"RIFF", &body);
        riff
    }

    fn from_body(body: &[u8]) -> Option<Self> {
        Some(Self {
            micro_sec_per_frame: read_u32(body, 0)?,
            total_frames: read_u32(body, 16)?,
            width: read_u32(body, 32)?,
            height: read_u32(body, 36)?,
        })
    }
}

fn find_main_header(mut chunks: &[u8]) -> Option<AviMainHeader> {
    while chunks.len() >= 8 {
        let size = read_u32(chunks, 4)? as usize;
        let end = 8usize.saturating_add(size).min(chunks.len());
        let body = &chunks[8..end];
        match &chunks[0..4] {
            b"avih" => return AviMainHeader::from_body(body),
            b"LIST" if body.starts_with(b"hdrl") => return find_main_header(&body[4..]),
            _ => {}
        }
        // chunk bodies are word aligned
        let next = end.saturating_add(size & 1);
        chunks = chunks.get(next..).unwrap_or(&[]);
    }
    None
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn push_chunk(out: &mut Vec<u8>, id: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
}
