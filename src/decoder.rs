use crate::frame::{ChannelOrder, Frame};
use crate::source::{VideoInfo, VideoSource};
use crate::{PlayerError, Result};
use ffmpeg_next as ffmpeg;
use log::{debug, info};
use std::path::Path;

/// Open handles of an in-process decode session
struct Session {
    input_context: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
    eof_sent: bool,
}

/// Video decoder that extracts frames from video files through libav*
pub struct VideoDecoder {
    session: Option<Session>,
    info: VideoInfo,
    frame_count: u64,
}

fn unavailable(path: &Path, what: &str, e: ffmpeg::Error) -> PlayerError {
    PlayerError::SourceUnavailable(format!("{} for '{}': {}", what, path.display(), e))
}

impl VideoDecoder {
    /// Create a new VideoDecoder from a file path
    pub fn open(path: &Path) -> Result<Self> {
        // Initialize FFmpeg with error handling
        if let Err(e) = ffmpeg::init() {
            debug!("FFmpeg init error: {:?}", e);
        }

        debug!("Attempting to open video file: {}", path.display());
        let input_context = ffmpeg::format::input(&path)
            .map_err(|e| unavailable(path, "Failed to open video file", e))?;

        // Find the best video stream
        let stream = input_context
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                PlayerError::SourceUnavailable(format!(
                    "No video stream found in file '{}'",
                    path.display()
                ))
            })?;
        let stream_index = stream.index();
        info!("Found video stream {} in file '{}'", stream_index, path.display());

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| unavailable(path, "Failed to create codec context", e))?;
        let decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| unavailable(path, "Failed to create video decoder", e))?;

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 && rate.numerator() > 0 {
            Some(f64::from(rate.numerator()) / f64::from(rate.denominator()))
        } else {
            None
        };
        let total_frames = u64::try_from(stream.frames()).ok().filter(|&n| n > 0);
        let duration = if stream.duration() != ffmpeg::ffi::AV_NOPTS_VALUE {
            let time_base = stream.time_base();
            Some(
                stream.duration() as f64 * f64::from(time_base.numerator())
                    / f64::from(time_base.denominator()),
            )
        } else {
            None
        };

        let info = VideoInfo {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            duration,
        };
        debug!("Video info: {:?}", info);

        Ok(Self {
            session: Some(Session {
                input_context,
                stream_index,
                decoder,
                scaler: None,
                eof_sent: false,
            }),
            info,
            frame_count: 0,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }
}

impl Session {
    /// Next packet belonging to our stream, or `None` at end of file.
    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.input_context
            .packets()
            .find_map(|(stream, packet)| (stream.index() == index).then_some(packet))
    }

    /// Drive the decoder until it produces a frame or runs dry.
    fn decode_next(&mut self) -> std::result::Result<Option<ffmpeg::frame::Video>, ffmpeg::Error> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }

    /// Convert a decoded frame to tightly packed RGB24.
    fn to_rgb(
        &mut self,
        frame: &ffmpeg::frame::Video,
    ) -> std::result::Result<(u32, u32, Vec<u8>), ffmpeg::Error> {
        let width = frame.width();
        let height = frame.height();

        // Initialize scaler if needed
        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg::software::scaling::Context::get(
                frame.format(),
                width,
                height,
                ffmpeg::format::Pixel::RGB24,
                width,
                height,
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        if let Some(ref mut scaler) = self.scaler {
            scaler.run(frame, &mut rgb_frame)?;
        }

        // Rows may be padded out to the stride.
        let stride = rgb_frame.stride(0);
        let row_len = width as usize * 3;
        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in rgb_frame.data(0).chunks(stride).take(height as usize) {
            data.extend_from_slice(&row[..row_len]);
        }
        Ok((width, height, data))
    }
}

impl VideoSource for VideoDecoder {
    fn nominal_frame_rate(&self) -> Option<f64> {
        self.info.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let frame_number = self.frame_count + 1;
        let failure = |e: ffmpeg::Error| PlayerError::DecodeFailure {
            frame: frame_number,
            reason: e.to_string(),
        };

        let Some(decoded) = session.decode_next().map_err(failure)? else {
            debug!("Decoder drained after {} frames", self.frame_count);
            return Ok(None);
        };
        self.frame_count = frame_number;

        let (width, height, data) = session.to_rgb(&decoded).map_err(failure)?;
        debug!("Decoded frame {}: {}x{}", frame_number, width, height);
        Frame::from_packed(width, height, data, ChannelOrder::Rgb).map(Some)
    }

    fn total_frames(&self) -> Option<u64> {
        self.info.total_frames
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            debug!("Decoder released after {} frames", self.frame_count);
        }
    }
}
