use crate::Error;

/// One decoded frame from the sensor.
///
/// `Ascii` carries the unscaled integer the sensor reported; the caller
/// (the HAL's `Co2Probe` impl) is responsible for multiplying by the
/// sensor's queried [`Multiplier`](crate::Multiplier). `Binary` carries the
/// ppm value directly — binary frames are never scaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Ascii { token: String, value: i64 },
    Binary { ppm: u16 },
}

const BINARY_FRAME_LEN: usize = 7;
const BINARY_SYNC: u8 = 0xFE;

/// Attempts to parse a single frame from the front of `buf`.
///
/// Returns `Ok(Some((frame, consumed)))` on success, `Ok(None)` if `buf`
/// does not yet contain a complete frame, or `Err` for a malformed frame
/// (the caller should discard the returned number of bytes... in this
/// protocol that is always the whole buffer up to the point the frame was
/// found to be bad, since there is no CRC to resynchronize on).
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, Error> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf[0] == BINARY_SYNC {
        if buf.len() < BINARY_FRAME_LEN {
            return Ok(None);
        }
        let ppm = u16::from_be_bytes([buf[3], buf[4]]);
        return Ok(Some((Frame::Binary { ppm }, BINARY_FRAME_LEN)));
    }

    match buf.iter().position(|&b| b == b'\n') {
        None => Ok(None),
        Some(nl_pos) => {
            let line = &buf[..nl_pos];
            let consumed = nl_pos + 1;
            let frame = parse_ascii_line(line)?;
            Ok(Some((frame, consumed)))
        }
    }
}

/// Parses one LF-terminated (CR optionally still attached) ASCII line:
/// a token, whitespace, then a decimal integer. Non-digit bytes in the
/// value portion are stripped rather than rejected, matching the sensor's
/// habit of padding with leading spaces or zeros (see scenario S6's
/// `" Z 00473\r\n"`).
fn parse_ascii_line(line: &[u8]) -> Result<Frame, Error> {
    let line = trim_trailing_cr(line);
    let trimmed = trim_leading_spaces(line);
    let space_pos = trimmed
        .iter()
        .position(|&b| b == b' ')
        .ok_or(Error::Malformed("no token/value separator"))?;
    let token = std::str::from_utf8(&trimmed[..space_pos])
        .map_err(|_| Error::Malformed("token is not utf8"))?
        .to_string();
    let digits: String = trimmed[space_pos..]
        .iter()
        .filter(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect();
    if digits.is_empty() {
        return Err(Error::Malformed("no digits in value"));
    }
    let value: i64 = digits
        .parse()
        .map_err(|_| Error::Malformed("value does not fit in i64"))?;
    Ok(Frame::Ascii { token, value })
}

fn trim_trailing_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((b'\r', rest)) => rest,
        _ => line,
    }
}

fn trim_leading_spaces(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|&b| b != b' ').unwrap_or(line.len());
    &line[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_frame_decodes_big_endian_word_at_3_4() {
        let raw = [0xFE, 0, 0, 0x01, 0xD9, 0, 0];
        let (frame, consumed) = parse_frame(&raw).unwrap().unwrap();
        assert_eq!(frame, Frame::Binary { ppm: 473 });
        assert_eq!(consumed, 7);
    }

    #[test]
    fn binary_frame_waits_for_full_seven_bytes() {
        let raw = [0xFE, 0, 0, 0x01];
        assert_eq!(parse_frame(&raw).unwrap(), None);
    }

    #[test]
    fn ascii_frame_with_leading_space_and_padding() {
        let raw = b" Z 00473\r\n";
        let (frame, consumed) = parse_frame(raw).unwrap().unwrap();
        assert_eq!(
            frame,
            Frame::Ascii {
                token: "Z".to_string(),
                value: 473
            }
        );
        assert_eq!(consumed, raw.len());
    }

    #[test]
    fn ascii_frame_waits_for_newline() {
        let raw = b"Z 473";
        assert_eq!(parse_frame(raw).unwrap(), None);
    }

    #[test]
    fn ascii_frame_rejects_missing_digits() {
        let raw = b"Z \r\n";
        assert!(parse_frame(raw).is_err());
    }
}
