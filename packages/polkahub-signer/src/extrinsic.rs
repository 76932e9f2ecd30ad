use crate::signer::SignatureScheme;
use parity_scale_codec::{Compact, Encode};
use polkahub_address::PublicKey;

const EXTRINSIC_V4_SIGNED: u8 = 0x84;
const MULTI_ADDRESS_ID: u8 = 0x00;

/// A signed v4 extrinsic:
/// `compact(len) ++ 0x84 ++ MultiAddress::Id(pk) ++ MultiSignature ++ extra ++ call`
pub fn signed_extrinsic_v4(
    public_key: &PublicKey,
    scheme: SignatureScheme,
    signature: &[u8],
    extra: &[u8],
    call_data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + 32 + 1 + signature.len() + extra.len() + call_data.len());
    body.push(EXTRINSIC_V4_SIGNED);
    body.push(MULTI_ADDRESS_ID);
    body.extend_from_slice(public_key);
    body.push(scheme.tag());
    body.extend_from_slice(signature);
    body.extend_from_slice(extra);
    body.extend_from_slice(call_data);

    let mut out = Compact(body.len() as u32).encode();
    out.extend(body);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use parity_scale_codec::Decode;

    #[test]
    fn layout() {
        let pk = [9u8; 32];
        let sig = [0xaa; 64];
        let tx = signed_extrinsic_v4(&pk, SignatureScheme::Sr25519, &sig, &[1, 2], &[3, 4, 5]);

        let mut input = &tx[..];
        let len = Compact::<u32>::decode(&mut input).unwrap().0 as usize;
        assert_eq!(len, input.len());
        assert_eq!(len, 1 + 1 + 32 + 1 + 64 + 2 + 3);

        assert_eq!(input[0], 0x84);
        assert_eq!(input[1], 0x00);
        assert_eq!(&input[2..34], &pk);
        assert_eq!(input[34], 0x01);
        assert_eq!(&input[35..99], &sig);
        assert_eq!(&input[99..], &[1, 2, 3, 4, 5]);
    }
}
