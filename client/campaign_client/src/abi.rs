//! Minimal contract ABI encoding for the campaign's call surface.
//!
//! Only what the campaign needs: zero- or one-`uint256`-argument calls, and
//! decoding of `uint256`, `address` and `string` return values plus
//! `Error(string)` revert payloads.

use sha3::{Digest, Keccak256};

use crate::errors::ProxyError;

const WORD: usize = 32;

/// `Error(string)` selector used by Solidity `require`/`revert` reasons.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `signature` with the given `uint256` arguments, `0x`-prefixed.
pub fn encode_call(signature: &str, uint_args: &[u64]) -> String {
    let mut data = selector(signature).to_vec();
    for arg in uint_args {
        let mut word = [0u8; WORD];
        word[WORD - 8..].copy_from_slice(&arg.to_be_bytes());
        data.extend_from_slice(&word);
    }
    format!("0x{}", hex::encode(data))
}

pub fn decode_hex(data: &str) -> Result<Vec<u8>, ProxyError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| ProxyError::Decode(format!("invalid hex: {e}")))
}

fn word(data: &[u8], index: usize) -> Result<&[u8], ProxyError> {
    let start = index.saturating_mul(WORD);
    data.get(start..start.saturating_add(WORD)).ok_or_else(|| {
        ProxyError::Decode(format!(
            "return data too short: need word {index}, have {} bytes",
            data.len()
        ))
    })
}

fn word_as_usize(word: &[u8]) -> Result<usize, ProxyError> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(ProxyError::Decode("offset or length out of range".to_string()));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail))
        .map_err(|_| ProxyError::Decode("offset or length out of range".to_string()))
}

/// Base-10 rendering of a big-endian unsigned integer of any width.
fn to_decimal(be_bytes: &[u8]) -> String {
    let mut n = be_bytes.to_vec();
    let mut digits = Vec::new();
    while n.iter().any(|b| *b != 0) {
        let mut rem: u32 = 0;
        for byte in n.iter_mut() {
            let acc = (rem << 8) | u32::from(*byte);
            *byte = (acc / 10) as u8;
            rem = acc % 10;
        }
        digits.push(char::from(b'0' + rem as u8));
    }
    if digits.is_empty() {
        return "0".to_string();
    }
    digits.iter().rev().collect()
}

/// `uint256` at word `index`, as decimal digits.
pub fn decode_uint(data: &[u8], index: usize) -> Result<String, ProxyError> {
    word(data, index).map(to_decimal)
}

/// `address` at word `index`, as `0x`-prefixed lowercase hex.
pub fn decode_address(data: &[u8], index: usize) -> Result<String, ProxyError> {
    let w = word(data, index)?;
    Ok(format!("0x{}", hex::encode(&w[WORD - 20..])))
}

/// A single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, ProxyError> {
    let past_end = |what: &str| ProxyError::Decode(format!("string {what} past end of data"));

    let offset = word_as_usize(word(data, 0)?)?;
    let start = offset.checked_add(WORD).ok_or_else(|| past_end("offset"))?;
    let len_word = data.get(offset..start).ok_or_else(|| past_end("offset"))?;
    let len = word_as_usize(len_word)?;
    let end = start.checked_add(len).ok_or_else(|| past_end("length"))?;
    let bytes = data.get(start..end).ok_or_else(|| past_end("length"))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| ProxyError::Decode(format!("string is not UTF-8: {e}")))
}

/// Reason carried by an `Error(string)` revert payload, if that is what it is.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    decode_string(payload).ok()
}
