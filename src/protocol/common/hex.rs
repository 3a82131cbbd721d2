use num_traits::{CheckedAdd, CheckedMul, FromPrimitive, Zero};

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeHexError {
    NotAscii,
    Empty,
    Overflow,
    InvalidOutput,
}

/// Decode a big-endian GDB hex string (as used for addresses, lengths and
/// register numbers) into an integer.
pub fn decode_hex<I>(buf: &[u8]) -> Result<I, DecodeHexError>
where
    I: FromPrimitive + Zero + CheckedAdd + CheckedMul,
{
    use DecodeHexError::*;

    if buf.is_empty() {
        return Err(Empty);
    }

    let radix = I::from_u8(16).ok_or(InvalidOutput)?;
    buf.iter().try_fold(I::zero(), |acc, &digit| {
        let x = I::from_u8(ascii2nibble(digit).ok_or(NotAscii)?).ok_or(InvalidOutput)?;
        acc.checked_mul(&radix)
            .ok_or(Overflow)?
            .checked_add(&x)
            .ok_or(Overflow)
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeHexBufError {
    NotAscii,
    OddLength,
}

fn ascii2nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode a hex byte string into raw bytes _in place_, returning the
/// decoded prefix of `buf`.
pub fn decode_hex_buf(buf: &mut [u8]) -> Result<&mut [u8], DecodeHexBufError> {
    use DecodeHexBufError::*;

    if buf.len() % 2 != 0 {
        return Err(OddLength);
    }

    let decoded_len = buf.len() / 2;
    for i in 0..decoded_len {
        let hi = ascii2nibble(buf[i * 2]).ok_or(NotAscii)?;
        let lo = ascii2nibble(buf[i * 2 + 1]).ok_or(NotAscii)?;
        buf[i] = hi << 4 | lo;
    }

    Ok(&mut buf[..decoded_len])
}

/// Lowercase hex digit for the low nibble of `nibble`.
pub fn nibble2ascii(nibble: u8) -> u8 {
    b"0123456789abcdef"[usize::from(nibble & 0xf)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_simple() {
        assert_eq!(decode_hex::<u32>(b"1000"), Ok(0x1000));
        assert_eq!(decode_hex::<u32>(b"DEADbeef"), Ok(0xdead_beef));
        assert_eq!(decode_hex::<u8>(b"19"), Ok(25));
    }

    #[test]
    fn decode_hex_errors() {
        assert_eq!(decode_hex::<u32>(b""), Err(DecodeHexError::Empty));
        assert_eq!(decode_hex::<u32>(b"12g4"), Err(DecodeHexError::NotAscii));
        assert_eq!(decode_hex::<u8>(b"100"), Err(DecodeHexError::Overflow));
    }

    #[test]
    fn decode_hex_buf_in_place() {
        let mut payload = b"0010a0e1".to_vec();
        let res = decode_hex_buf(&mut payload).unwrap();
        assert_eq!(res, [0x00, 0x10, 0xa0, 0xe1]);
    }

    #[test]
    fn decode_hex_buf_odd() {
        let mut payload = b"12345".to_vec();
        assert_eq!(decode_hex_buf(&mut payload), Err(DecodeHexBufError::OddLength));
    }

    #[test]
    fn nibbles() {
        assert_eq!(nibble2ascii(0x0), b'0');
        assert_eq!(nibble2ascii(0xb), b'b');
        assert_eq!(nibble2ascii(0x1f), b'f');
    }
}
