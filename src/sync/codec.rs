use std::io;

use bytes::{BufMut, BytesMut};
use log::trace;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::sync::{Envelope, MalformedMessage};

pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Newline-delimited JSON envelopes.
///
/// A line that cannot be understood is yielded as an `Err` item instead of
/// failing the stream, so one bad message never takes the channel down.
#[derive(Debug)]
pub struct EnvelopeCodec {
    lines: LinesCodec,
    max_length: usize,
}

impl EnvelopeCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    fn parse(&self, line: Result<Option<String>, LinesCodecError>) -> io::Result<Option<<Self as Decoder>::Item>> {
        match line {
            Ok(Some(line)) => {
                trace!("<< {line}");
                Ok(Some(serde_json::from_str(&line).map_err(MalformedMessage::from)))
            }
            Ok(None) => Ok(None),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                Ok(Some(Err(MalformedMessage::TooLong(self.max_length))))
            }
            Err(LinesCodecError::Io(error)) if error.kind() == io::ErrorKind::InvalidData => {
                Ok(Some(Err(MalformedMessage::Encoding)))
            }
            Err(LinesCodecError::Io(error)) => Err(error),
        }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Result<Envelope, MalformedMessage>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let line = self.lines.decode(src);
            if matches!(&line, Ok(Some(line)) if line.trim().is_empty()) {
                continue;
            }
            return self.parse(line);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let line = self.lines.decode_eof(src);
            if matches!(&line, Ok(Some(line)) if line.trim().is_empty()) {
                continue;
            }
            return self.parse(line);
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = serde_json::to_string(&item)?;
        trace!(">> {line}");
        dst.reserve(line.len() + 1);
        dst.put(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
