use crate::{parse_frame, Error, Frame};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// A [`tokio_util::codec::Decoder`] wrapping [`parse_frame`] for use with
/// `tokio_util::codec::Framed` over the CO₂ sensor's serial stream.
///
/// Encoding isn't implemented as a codec `Encoder` impl: the init/read
/// commands sent to the sensor are fixed byte strings
/// ([`crate::MULTIPLIER_QUERY`], [`crate::POLLING_MODE_SET`]) written
/// directly to the port, not framed values.
#[derive(Debug, Default)]
pub struct Co2Codec {
    _private: (),
}

impl Co2Codec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for Co2Codec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match parse_frame(src) {
            Ok(Some((frame, consumed))) => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                // No CRC to resynchronize on for this protocol; discard up
                // to the first newline (or the whole buffer for a runt
                // binary frame) and let the next call try again.
                if let Some(nl_pos) = src.iter().position(|&b| b == b'\n') {
                    src.advance(nl_pos + 1);
                } else {
                    src.clear();
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ascii_frame_and_advances_buffer() {
        let mut codec = Co2Codec::new();
        let mut buf = BytesMut::from(&b" Z 00473\r\ntrailing"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            frame,
            Frame::Ascii {
                token: "Z".to_string(),
                value: 473
            }
        );
        assert_eq!(&buf[..], b"trailing");
    }

    #[test]
    fn decodes_binary_frame_and_advances_buffer() {
        let mut codec = Co2Codec::new();
        let mut buf = BytesMut::from(&[0xFEu8, 0, 0, 0x01, 0xD9, 0, 0, 0xAA][..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, Frame::Binary { ppm: 473 });
        assert_eq!(&buf[..], &[0xAA]);
    }

    #[test]
    fn incomplete_frame_yields_none_without_consuming() {
        let mut codec = Co2Codec::new();
        let mut buf = BytesMut::from(&b"Z 473"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"Z 473");
    }
}
