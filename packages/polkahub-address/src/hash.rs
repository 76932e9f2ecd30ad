use blake2::{digest::consts::U32, Blake2b, Blake2b512, Digest};

type Blake2b256 = Blake2b<U32>;

pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b256::digest(data));
    out
}

const SS58_CONTEXT: &[u8] = b"SS58PRE";

pub(crate) fn ss58_checksum(data: &[u8]) -> [u8; 2] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_CONTEXT);
    hasher.update(data);
    let hash = hasher.finalize();
    [hash[0], hash[1]]
}
