//! Frame encoding/decoding.
//!
//! ```text
//! +-----+-----+-----------+------------------+--------------+-----+
//! | STX | LEN | CMD (1|2) | [PASSWORD (4 LE)] | PARAMS...    | LRC |
//! +-----+-----+-----------+------------------+--------------+-----+
//! ```
//!
//! `LEN` counts `CMD` through `PARAMS`. `LRC` is the XOR of `LEN`, `CMD` and
//! `PARAMS`. Fiscal-storage commands use a two-byte code: the signal byte
//! `0xFF` followed by the low byte, so `0xFF01` goes out as `FF 01`.

use crate::error::{KkmError, Result};

pub const STX: u8 = 0x02;
pub const ENQ: u8 = 0x05;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

/// Signal byte that prefixes extended (two-byte) command codes.
pub const EXTENDED_PREFIX: u8 = 0xFF;

/// Largest value `LEN` can carry.
pub const MAX_BODY_LEN: usize = u8::MAX as usize;

/// Byte-wise XOR checksum.
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Wire bytes of a command code: one byte, or `0xFF` + low byte. `0xFF`
/// alone is the extended prefix and is rejected.
pub fn command_bytes(code: u16) -> Result<Vec<u8>> {
    match code {
        0..=0xFE => Ok(vec![code as u8]),
        0xFF00..=0xFFFF => Ok(vec![EXTENDED_PREFIX, (code & 0xFF) as u8]),
        other => Err(KkmError::Argument(format!(
            "command code 0x{other:04X} is neither single-byte nor 0xFFxx"
        ))),
    }
}

/// Build a complete frame.
///
/// The password, when given, is placed little-endian between the command
/// code and the parameters and counts towards `LEN`.
pub fn encode(code: u16, password: Option<u32>, params: &[u8]) -> Result<Vec<u8>> {
    let cmd = command_bytes(code)?;
    let pw_len = if password.is_some() { 4 } else { 0 };
    let body_len = cmd.len() + pw_len + params.len();
    if body_len > MAX_BODY_LEN {
        return Err(KkmError::Argument(format!(
            "frame body of {body_len} bytes exceeds {MAX_BODY_LEN}"
        )));
    }

    let mut frame = Vec::with_capacity(body_len + 3);
    frame.push(STX);
    frame.push(body_len as u8);
    frame.extend_from_slice(&cmd);
    if let Some(pw) = password {
        frame.extend_from_slice(&pw.to_le_bytes());
    }
    frame.extend_from_slice(params);
    let checksum = lrc(&frame[1..]);
    frame.push(checksum);
    Ok(frame)
}

/// Split a payload (the `LEN` bytes of a frame) into command code and rest.
pub fn decode_command(payload: &[u8]) -> Result<(u16, &[u8])> {
    match payload {
        [] => Err(KkmError::ProtocolViolation(
            "empty payload, no command byte".into(),
        )),
        [EXTENDED_PREFIX, low, rest @ ..] => Ok((0xFF00 | *low as u16, rest)),
        [EXTENDED_PREFIX] => Err(KkmError::ProtocolViolation(
            "extended command prefix without low byte".into(),
        )),
        [code, rest @ ..] => Ok((*code as u16, rest)),
    }
}

/// Validate a complete frame and return its command code and the bytes after
/// the code (password included, if any).
pub fn decode_frame(frame: &[u8]) -> Result<(u16, &[u8])> {
    let (&stx, rest) = frame
        .split_first()
        .ok_or_else(|| KkmError::ProtocolViolation("empty frame".into()))?;
    if stx != STX {
        return Err(KkmError::ProtocolViolation(format!(
            "frame starts with 0x{stx:02X}, expected STX"
        )));
    }
    let (&len, rest) = rest
        .split_first()
        .ok_or_else(|| KkmError::ProtocolViolation("frame has no LEN byte".into()))?;
    let len = len as usize;
    if rest.len() != len + 1 {
        return Err(KkmError::ProtocolViolation(format!(
            "LEN says {len} bytes, frame carries {}",
            rest.len().saturating_sub(1)
        )));
    }
    let (payload, checksum) = rest.split_at(len);
    let expected = lrc(&frame[1..2 + len]);
    if checksum[0] != expected {
        return Err(KkmError::ProtocolViolation(format!(
            "checksum 0x{:02X} does not match computed 0x{expected:02X}",
            checksum[0]
        )));
    }
    decode_command(payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_command() {
        let frame = encode(0x10, None, &[]).unwrap();
        assert_eq!(frame, vec![STX, 0x01, 0x10, 0x10]);
    }

    #[test]
    fn test_extended_command() {
        let frame = encode(0xFF01, None, &[]).unwrap();
        assert_eq!(frame[1], 2);
        assert_eq!(&frame[2..4], &[0xFF, 0x01]);
        assert_eq!(frame[4], 0x02 ^ 0xFF ^ 0x01);
    }

    #[test]
    fn test_password_is_little_endian() {
        let frame = encode(0x10, Some(30), &[]).unwrap();
        assert_eq!(frame, vec![STX, 0x05, 0x10, 30, 0, 0, 0, 0x05 ^ 0x10 ^ 30]);
    }

    #[test]
    fn test_len_counts_code_and_params() {
        for (code, params) in [
            (0x17u16, vec![0x03u8, b'h', b'i']),
            (0xFF0C, vec![1, 2, 3, 4, 5, 6]),
            (0xFC, vec![]),
        ] {
            let frame = encode(code, None, &params).unwrap();
            let width = if code > 0xFF { 2 } else { 1 };
            assert_eq!(frame[1] as usize, width + params.len());
        }
    }

    #[test]
    fn test_decode_frame_recovers_code_and_params() {
        let params = [0x01, 0x02, 0xFE, 0x00, 0x7F];
        for code in [0x10u16, 0x80, 0xFC, 0xFF01, 0xFF43] {
            let frame = encode(code, None, &params).unwrap();
            let (decoded, rest) = decode_frame(&frame).unwrap();
            assert_eq!(decoded, code);
            assert_eq!(rest, &params);
            let len = frame[1] as usize;
            assert_eq!(lrc(&frame[1..2 + len]), *frame.last().unwrap());
        }
    }

    #[test]
    fn test_decode_command_extended() {
        let (code, rest) = decode_command(&[0xFF, 0x01, 0x00, 0x05]).unwrap();
        assert_eq!(code, 0xFF01);
        assert_eq!(rest, &[0x00, 0x05]);

        let (code, rest) = decode_command(&[0x10, 0x00]).unwrap();
        assert_eq!(code, 0x10);
        assert_eq!(rest, &[0x00]);
    }

    #[test]
    fn test_decode_command_errors() {
        assert!(decode_command(&[]).is_err());
        assert!(decode_command(&[0xFF]).is_err());
    }

    #[test]
    fn test_decode_frame_bad_checksum() {
        let mut frame = encode(0x11, Some(1), &[]).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x55;
        assert!(matches!(
            decode_frame(&frame),
            Err(KkmError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_invalid_command_code() {
        assert!(matches!(
            encode(0x1234, None, &[]),
            Err(KkmError::Argument(_))
        ));
    }

    #[test]
    fn test_prefix_byte_is_not_a_command() {
        assert!(matches!(
            encode(0xFF, None, &[0x01, 0x02]),
            Err(KkmError::Argument(_))
        ));
        assert!(matches!(command_bytes(0xFF), Err(KkmError::Argument(_))));
        assert_eq!(command_bytes(0xFE).unwrap(), vec![0xFE]);
    }

    #[test]
    fn test_oversized_body() {
        let params = vec![0u8; 255];
        assert!(matches!(
            encode(0x1E, None, &params),
            Err(KkmError::Argument(_))
        ));
        assert!(encode(0x1E, None, &params[..254]).is_ok());
    }
}
