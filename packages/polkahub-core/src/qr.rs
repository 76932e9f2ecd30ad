//! Polkadot Vault's "universal offline signature" QR payloads and their multipart framing
//! https://github.com/novasamatech/parity-signer/blob/738e34f0b60f86b718267cfe1ca766bd291640ed/docs/src/development/UOS.md

use crate::error::{HubError, Result};
use parity_scale_codec::{Compact, Encode};
use polkahub_address::PublicKey;

pub const VAULT_QR_HEADER: u8 = 0x53;
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024;

const MULTIPART_FRAME: u8 = 0x00;
const FRAME_HEADER_LEN: usize = 5;
const MESSAGE_OPEN: &[u8] = b"<Bytes>";
const MESSAGE_CLOSE: &[u8] = b"</Bytes>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VaultQrEncryption {
    Ed25519 = 0x00,
    Sr25519 = 0x01,
    Ecdsa = 0x02,
    Unsigned = 0xff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VaultQrPayloadType {
    LegacyTx = 0x00,
    Tx = 0x02,
    Message = 0x03,
    BulkTx = 0x04,
    ProofTx = 0x06,
}

fn header(encryption: VaultQrEncryption, kind: VaultQrPayloadType, public_key: &PublicKey) -> Vec<u8> {
    let mut out = vec![VAULT_QR_HEADER, encryption as u8, kind as u8];
    out.extend_from_slice(public_key);
    out
}

pub fn qr_transaction(
    encryption: VaultQrEncryption,
    public_key: &PublicKey,
    call_data: &[u8],
    extensions: &[u8],
    genesis: &[u8],
) -> Vec<u8> {
    let mut out = header(encryption, VaultQrPayloadType::Tx, public_key);
    Compact(call_data.len() as u32).encode_to(&mut out);
    out.extend_from_slice(call_data);
    out.extend_from_slice(extensions);
    out.extend_from_slice(genesis);
    out
}

/// Like [qr_transaction], with the metadata proof right after the public key
pub fn qr_proofed_transaction(
    encryption: VaultQrEncryption,
    public_key: &PublicKey,
    metadata_proof: &[u8],
    call_data: &[u8],
    extensions: &[u8],
    genesis: &[u8],
) -> Vec<u8> {
    let mut out = header(encryption, VaultQrPayloadType::ProofTx, public_key);
    out.extend_from_slice(metadata_proof);
    Compact(call_data.len() as u32).encode_to(&mut out);
    out.extend_from_slice(call_data);
    out.extend_from_slice(extensions);
    out.extend_from_slice(genesis);
    out
}

pub fn qr_message(
    encryption: VaultQrEncryption,
    public_key: &PublicKey,
    data: &[u8],
    genesis: &[u8],
) -> Vec<u8> {
    let mut out = header(encryption, VaultQrPayloadType::Message, public_key);
    out.extend_from_slice(MESSAGE_OPEN);
    out.extend_from_slice(data);
    out.extend_from_slice(MESSAGE_CLOSE);
    out.extend_from_slice(genesis);
    out
}

/// Splits a payload into near-equal chunks of at most `max_frame_size` bytes,
/// each prefixed with `[0x00][u16 BE frame count][u16 BE frame index]`
pub fn create_frames(payload: &[u8], max_frame_size: usize) -> Result<Vec<Vec<u8>>> {
    if max_frame_size == 0 {
        return Err(HubError::invalid_frame("max frame size must be positive"));
    }
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let frame_amount = payload.len().div_ceil(max_frame_size);
    let frame_size = payload.len().div_ceil(frame_amount);
    let chunks: Vec<&[u8]> = payload.chunks(frame_size).collect();

    let count = u16::try_from(chunks.len())
        .map_err(|_| HubError::invalid_frame(format!("{} frames is too many", chunks.len())))?;

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + chunk.len());
            frame.push(MULTIPART_FRAME);
            frame.extend_from_slice(&count.to_be_bytes());
            // index < count, which fits
            frame.extend_from_slice(&(index as u16).to_be_bytes());
            frame.extend_from_slice(chunk);
            frame
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub count: u16,
    pub index: u16,
    pub data: &'a [u8],
}

pub fn decode_frame(frame: &[u8]) -> Result<Frame<'_>> {
    if frame.len() < FRAME_HEADER_LEN {
        return Err(HubError::invalid_frame(format!(
            "frame is only {} bytes",
            frame.len()
        )));
    }
    if frame[0] != MULTIPART_FRAME {
        return Err(HubError::invalid_frame(format!(
            "unexpected frame marker {:#04x}",
            frame[0]
        )));
    }

    let count = u16::from_be_bytes([frame[1], frame[2]]);
    let index = u16::from_be_bytes([frame[3], frame[4]]);
    if index >= count {
        return Err(HubError::invalid_frame(format!(
            "frame {index} out of {count}"
        )));
    }

    Ok(Frame {
        count,
        index,
        data: &frame[FRAME_HEADER_LEN..],
    })
}

/// Frames may arrive in any order, but all of them must be present exactly once
pub fn assemble_frames<'a>(frames: impl IntoIterator<Item = &'a [u8]>) -> Result<Vec<u8>> {
    let mut parts: Vec<Option<&[u8]>> = Vec::new();
    let mut expected: Option<u16> = None;

    for frame in frames {
        let frame = decode_frame(frame)?;
        match expected {
            None => {
                expected = Some(frame.count);
                parts = vec![None; frame.count as usize];
            }
            Some(count) if count != frame.count => {
                return Err(HubError::invalid_frame(format!(
                    "frame count changed from {count} to {}",
                    frame.count
                )));
            }
            Some(_) => {}
        }

        let slot = &mut parts[frame.index as usize];
        if slot.is_some() {
            return Err(HubError::invalid_frame(format!(
                "duplicate frame {}",
                frame.index
            )));
        }
        *slot = Some(frame.data);
    }

    let mut out = Vec::new();
    for (index, part) in parts.into_iter().enumerate() {
        match part {
            Some(data) => out.extend_from_slice(data),
            None => return Err(HubError::invalid_frame(format!("missing frame {index}"))),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transaction_layout() {
        let payload = qr_transaction(
            VaultQrEncryption::Sr25519,
            &[7; 32],
            &[1, 2, 3],
            &[4, 5],
            &[9; 32],
        );

        assert_eq!(&payload[..3], &[0x53, 0x01, 0x02]);
        assert_eq!(&payload[3..35], &[7; 32]);
        // compact(3)
        assert_eq!(payload[35], 12);
        assert_eq!(&payload[36..41], &[1, 2, 3, 4, 5]);
        assert_eq!(&payload[41..], &[9; 32]);
    }

    #[test]
    fn proofed_transaction_layout() {
        let payload = qr_proofed_transaction(
            VaultQrEncryption::Sr25519,
            &[7; 32],
            &[0xaa, 0xbb],
            &[1],
            &[],
            &[9; 32],
        );
        assert_eq!(payload[2], 0x06);
        assert_eq!(&payload[35..37], &[0xaa, 0xbb]);
        assert_eq!(&payload[37..39], &[4, 1]);
    }

    #[test]
    fn message_layout() {
        let payload = qr_message(VaultQrEncryption::Sr25519, &[7; 32], b"hi", &[9; 32]);
        assert_eq!(payload[2], 0x03);
        assert_eq!(&payload[35..52], b"<Bytes>hi</Bytes>".as_slice());
        assert_eq!(payload.len(), 35 + 17 + 32);
    }

    #[test]
    fn frames_round_trip() {
        let payload: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let frames = create_frames(&payload, DEFAULT_MAX_FRAME_SIZE).unwrap();

        // 3 frames of 834, 834, 832
        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[0][..5], &[0, 0, 3, 0, 0]);
        assert_eq!(&frames[2][..5], &[0, 0, 3, 0, 2]);
        assert_eq!(frames[0].len() - 5, 834);
        assert_eq!(frames[2].len() - 5, 832);

        let mut shuffled: Vec<&[u8]> = frames.iter().map(|f| f.as_slice()).collect();
        shuffled.reverse();
        assert_eq!(assemble_frames(shuffled).unwrap(), payload);
    }

    #[test]
    fn small_and_empty_payloads() {
        let frames = create_frames(&[1, 2, 3], DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(frames, vec![vec![0, 0, 1, 0, 0, 1, 2, 3]]);

        assert!(create_frames(&[], DEFAULT_MAX_FRAME_SIZE).unwrap().is_empty());
        assert!(create_frames(&[1], 0).is_err());
    }

    #[test]
    fn bad_frames() {
        assert!(decode_frame(&[0, 0]).is_err());
        assert!(decode_frame(&[1, 0, 1, 0, 0]).is_err());
        assert!(decode_frame(&[0, 0, 1, 0, 1]).is_err());

        let frames = create_frames(&[0u8; 20], 10).unwrap();
        assert!(assemble_frames([frames[0].as_slice()]).is_err());
        assert!(assemble_frames([frames[0].as_slice(), frames[0].as_slice()]).is_err());
    }
}
