//! StrKey codec: version byte + payload + CRC16-XModem, base32 encoded

use crc::{Crc, CRC_16_XMODEM};

use crate::error::ViewerError;

const CHECKSUM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Version bytes; the first base32 character follows from the top five bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionByte {
    /// `G...`
    AccountId = 6 << 3,
    /// `S...`
    SecretSeed = 18 << 3,
}

pub fn encode(version: VersionByte, payload: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(35);
    data.push(version as u8);
    data.extend_from_slice(payload);
    let checksum = CHECKSUM.checksum(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    base32_encode(&data)
}

pub fn decode(version: VersionByte, encoded: &str) -> Result<[u8; 32], ViewerError> {
    if encoded.len() != 56 {
        return Err(ViewerError::InvalidKey(format!(
            "expected 56 characters, got {}",
            encoded.len()
        )));
    }

    let data = base32_decode(encoded)
        .ok_or_else(|| ViewerError::InvalidKey("invalid base32 character".to_string()))?;
    if data.len() != 35 {
        return Err(ViewerError::InvalidKey("invalid key length".to_string()));
    }
    if data[0] != version as u8 {
        return Err(ViewerError::InvalidKey("unexpected key version".to_string()));
    }

    let (body, checksum) = data.split_at(33);
    let expected = CHECKSUM.checksum(body).to_le_bytes();
    if checksum != expected {
        return Err(ViewerError::InvalidKey("checksum mismatch".to_string()));
    }

    let mut payload = [0u8; 32];
    payload.copy_from_slice(&body[1..]);
    Ok(payload)
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u64 = 0;
    let mut bits = 0u32;

    for byte in data {
        buffer = (buffer << 8) | *byte as u64;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(encoded: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits = 0u32;

    for c in encoded.bytes() {
        let value = ALPHABET.iter().position(|a| *a == c)? as u64;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
        buffer &= (1 << bits) - 1;
    }
    // Non-canonical trailing bits
    if buffer != 0 {
        return None;
    }
    Some(out)
}
