//! Audio header parsers

use super::{AudioInfo, Header, MetadataError};

/// `None` when no audio signature matches
pub(super) fn probe(data: &[u8], file_size: u64) -> Option<Result<AudioInfo, MetadataError>> {
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        Some(wav(Header::new(data, "WAV"), file_size))
    } else if data.starts_with(b"fLaC") {
        Some(flac(Header::new(data, "FLAC"), file_size))
    } else if data.starts_with(b"ID3") {
        Some(mp3_after_tag(Header::new(data, "MP3"), file_size))
    } else {
        // bare MPEG stream: only trust a frame header at offset 0
        let frame = data.get(0..4).and_then(FrameHeader::parse)?;
        Some(Ok(frame.info(file_size)))
    }
}

fn wav(h: Header<'_>, file_size: u64) -> Result<AudioInfo, MetadataError> {
    let mut format: Option<(u16, u32, u32)> = None;
    let mut data_size: Option<u64> = None;
    let mut pos = 12usize;

    while format.is_none() || data_size.is_none() {
        if pos + 8 > h.len() {
            break;
        }
        let id = h.bytes(pos, 4)?;
        let size = h.u32_le(pos + 4)? as u64;
        let body = pos + 8;
        match id {
            b"fmt " => {
                let channels = h.u16_le(body + 2)?;
                let sample_rate = h.u32_le(body + 4)?;
                let byte_rate = h.u32_le(body + 8)?;
                format = Some((channels, sample_rate, byte_rate));
            }
            b"data" => {
                // streaming writers leave the size unset
                let available = file_size.saturating_sub(body as u64);
                data_size = Some(size.min(available));
            }
            _ => {}
        }
        let advance = size + (size & 1);
        pos = match usize::try_from(advance).ok().and_then(|a| body.checked_add(a)) {
            Some(next) => next,
            None => break,
        };
    }

    let (channels, sample_rate, byte_rate) =
        format.ok_or(MetadataError::Truncated { format: "WAV" })?;
    if sample_rate == 0 {
        return Err(h.invalid("zero sample rate"));
    }
    let duration_secs = match (data_size, byte_rate) {
        (Some(size), rate) if rate > 0 => Some(size as f64 / rate as f64),
        _ => None,
    };
    Ok(AudioInfo {
        format: "WAV",
        duration_secs,
        // bytes/s to kbit/s without widening: b * 8 / 1000 == b / 125
        bitrate_kbps: (byte_rate > 0).then_some(byte_rate / 125),
        sample_rate: Some(sample_rate),
        channels: Some(channels),
    })
}

fn flac(h: Header<'_>, file_size: u64) -> Result<AudioInfo, MetadataError> {
    let block_type = h.u8(4)? & 0x7F;
    if block_type != 0 {
        return Err(h.invalid("first metadata block is not STREAMINFO"));
    }
    if h.u24_be(5)? < 34 {
        return Err(h.invalid("STREAMINFO block too short"));
    }
    // STREAMINFO body starts at 8; the packed fields start 10 bytes in
    let b = h.bytes(18, 8)?;
    let sample_rate = ((b[0] as u32) << 12) | ((b[1] as u32) << 4) | ((b[2] as u32) >> 4);
    let channels = (((b[2] >> 1) & 0x07) + 1) as u16;
    let total_samples = (((b[3] & 0x0F) as u64) << 32) | h.u32_be(22)? as u64;
    if sample_rate == 0 {
        return Err(h.invalid("zero sample rate"));
    }

    let duration_secs = (total_samples > 0).then(|| total_samples as f64 / sample_rate as f64);
    let bitrate_kbps = duration_secs
        .filter(|d| *d > 0.0)
        .map(|d| (file_size as f64 * 8.0 / d / 1000.0).round() as u32);
    Ok(AudioInfo {
        format: "FLAC",
        duration_secs,
        bitrate_kbps,
        sample_rate: Some(sample_rate),
        channels: Some(channels),
    })
}

fn mp3_after_tag(h: Header<'_>, file_size: u64) -> Result<AudioInfo, MetadataError> {
    let size = h.bytes(6, 4)?;
    if size.iter().any(|b| b & 0x80 != 0) {
        return Err(h.invalid("ID3 size is not syncsafe"));
    }
    let tag_size = size.iter().fold(0usize, |acc, b| (acc << 7) | *b as usize);
    let footer = if h.u8(5)? & 0x10 != 0 { 10 } else { 0 };
    let start = 10 + tag_size + footer;
    if start >= h.len() {
        return Err(MetadataError::Truncated { format: "MP3" });
    }

    let audio = h.bytes(start, h.len() - start)?;
    let frame = audio
        .windows(4)
        .find_map(FrameHeader::parse)
        .ok_or_else(|| h.invalid("no MPEG audio frame after ID3 tag"))?;
    Ok(frame.info(file_size.saturating_sub(start as u64)))
}

const MPEG1_LAYER3_KBPS: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const MPEG2_LAYER3_KBPS: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// MPEG audio Layer III frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    bitrate_kbps: u32,
    sample_rate: u32,
    channels: u16,
}

impl FrameHeader {
    fn parse(b: &[u8]) -> Option<Self> {
        if b.len() < 4 || b[0] != 0xFF || b[1] & 0xE0 != 0xE0 {
            return None;
        }
        let version = (b[1] >> 3) & 0x03;
        let layer = (b[1] >> 1) & 0x03;
        let bitrate_index = (b[2] >> 4) as usize;
        let rate_index = ((b[2] >> 2) & 0x03) as usize;
        if version == 1 || layer != 1 || bitrate_index == 0 || bitrate_index == 15 || rate_index == 3
        {
            return None;
        }

        let (bitrate_kbps, rates) = match version {
            3 => (MPEG1_LAYER3_KBPS[bitrate_index], [44100, 48000, 32000]),
            2 => (MPEG2_LAYER3_KBPS[bitrate_index], [22050, 24000, 16000]),
            _ => (MPEG2_LAYER3_KBPS[bitrate_index], [11025, 12000, 8000]),
        };
        let channels = if b[3] >> 6 == 3 { 1 } else { 2 };
        Some(Self {
            bitrate_kbps,
            sample_rate: rates[rate_index],
            channels,
        })
    }

    /// Duration assumes a constant bitrate across `audio_bytes`
    fn info(&self, audio_bytes: u64) -> AudioInfo {
        AudioInfo {
            format: "MP3",
            duration_secs: Some(audio_bytes as f64 * 8.0 / (self.bitrate_kbps as f64 * 1000.0)),
            bitrate_kbps: Some(self.bitrate_kbps),
            sample_rate: Some(self.sample_rate),
            channels: Some(self.channels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::WAV_SILENCE;
    use super::*;

    /// MPEG1 Layer III, 128 kbps, 44.1 kHz, joint stereo
    const MP3_FRAME: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

    #[test]
    fn test_wav() {
        let wav = probe(WAV_SILENCE, WAV_SILENCE.len() as u64)
            .unwrap()
            .unwrap();
        assert_eq!(wav.format, "WAV");
        assert_eq!(wav.channels, Some(1));
        assert_eq!(wav.sample_rate, Some(8000));
        assert_eq!(wav.bitrate_kbps, Some(128));
        let duration = wav.duration_secs.unwrap();
        assert!((duration - 0.001).abs() < 1e-9, "duration {duration}");
    }

    #[test]
    fn test_wav_huge_byte_rate() {
        let mut data = WAV_SILENCE.to_vec();
        data[28..32].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        let wav = probe(&data, data.len() as u64).unwrap().unwrap();
        assert_eq!(wav.bitrate_kbps, Some(0xFFFF_FFF0 / 125));
        assert!(wav.duration_secs.unwrap() > 0.0);
    }

    #[test]
    fn test_wav_header_cut_before_data() {
        // fmt chunk only, data chunk beyond the header buffer
        let wav = probe(&WAV_SILENCE[..36], 4096).unwrap().unwrap();
        assert_eq!(wav.sample_rate, Some(8000));
        assert_eq!(wav.duration_secs, None);
    }

    #[test]
    fn test_wav_without_fmt_is_truncated() {
        let data = b"RIFF\x04\x00\x00\x00WAVE";
        assert_eq!(
            probe(data, 12),
            Some(Err(MetadataError::Truncated { format: "WAV" }))
        );
    }

    #[test]
    fn test_flac_streaminfo() {
        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]); // last block, STREAMINFO, len 34
        data.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]); // block sizes
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]); // frame sizes
        // 44100 Hz, 2 channels, 16 bits, 88200 samples
        data.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x01, 0x58, 0x88]);
        data.extend_from_slice(&[0u8; 16]); // md5

        let flac = probe(&data, 100_000).unwrap().unwrap();
        assert_eq!(flac.format, "FLAC");
        assert_eq!(flac.sample_rate, Some(44100));
        assert_eq!(flac.channels, Some(2));
        assert_eq!(flac.duration_secs, Some(2.0));
        assert_eq!(flac.bitrate_kbps, Some(400));
    }

    #[test]
    fn test_mp3_bare_frame() {
        let mut data = MP3_FRAME.to_vec();
        data.resize(64, 0);
        let mp3 = probe(&data, 16_000).unwrap().unwrap();
        assert_eq!(mp3.format, "MP3");
        assert_eq!(mp3.bitrate_kbps, Some(128));
        assert_eq!(mp3.sample_rate, Some(44100));
        assert_eq!(mp3.channels, Some(2));
        assert_eq!(mp3.duration_secs, Some(1.0));
    }

    #[test]
    fn test_mp3_after_id3_tag() {
        let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x0A".to_vec();
        data.extend_from_slice(&[0u8; 10]);
        data.extend_from_slice(&MP3_FRAME);
        data.resize(128, 0);
        let mp3 = probe(&data, 16_020).unwrap().unwrap();
        assert_eq!(mp3.sample_rate, Some(44100));
        assert_eq!(mp3.duration_secs, Some(1.0));
    }

    #[test]
    fn test_id3_without_frame_is_invalid() {
        let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x02".to_vec();
        data.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            probe(&data, 32),
            Some(Err(MetadataError::Invalid { format: "MP3", .. }))
        ));
    }

    #[test]
    fn test_random_bytes_not_audio() {
        assert!(probe(&[0x12, 0x34, 0x56, 0x78, 0x9A], 5).is_none());
        // frame sync with reserved version bits
        assert!(probe(&[0xFF, 0xEB, 0x90, 0x64], 4).is_none());
    }
}
