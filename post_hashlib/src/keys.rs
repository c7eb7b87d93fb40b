// Copyright (c) 2025 Proof of Capacity Consortium
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! AES key derivation for nonce groups and single nonces.

/// Nonces sharing one group key
pub const NONCES_PER_GROUP: u32 = 16;

/// Length of the proof-of-work oracle input
pub const POW_INPUT_LEN: usize = 48;

/// Key shared by the 16 nonces of `group`:
/// `BLAKE3(challenge || LE32(group) || LE64(pow))[..16]`.
pub fn group_key(challenge: &[u8; 32], group: u32, pow: u64) -> [u8; 16] {
    truncate(&group_hasher(challenge, group, pow))
}

/// Key used to refine a single nonce when the first output byte ties the
/// threshold: the group key input extended with `LE32(nonce)`.
pub fn nonce_key(challenge: &[u8; 32], group: u32, pow: u64, nonce: u32) -> [u8; 16] {
    let mut hasher = group_hasher(challenge, group, pow);
    hasher.update(&nonce.to_le_bytes());
    truncate(&hasher)
}

/// Group id owning `nonce`.
#[inline]
pub fn group_of(nonce: u32) -> u32 {
    nonce / NONCES_PER_GROUP
}

/// Nonce selected by byte `offset` of a group cipher's output.
#[inline]
pub fn nonce_at(group: u32, offset: usize) -> u32 {
    group * NONCES_PER_GROUP + (offset % NONCES_PER_GROUP as usize) as u32
}

/// Builds the 48-byte oracle input for a nonce group.
///
/// Bytes `0..7` stay zero and belong to the oracle's search counter, byte 7
/// carries the low byte of the group id, then the first 8 challenge bytes and
/// the 32-byte miner id follow.
pub fn pow_input(group: u32, challenge: &[u8; 32], miner_id: &[u8; 32]) -> [u8; POW_INPUT_LEN] {
    let mut input = [0u8; POW_INPUT_LEN];
    input[7] = group as u8;
    input[8..16].copy_from_slice(&challenge[..8]);
    input[16..48].copy_from_slice(miner_id);
    input
}

fn group_hasher(challenge: &[u8; 32], group: u32, pow: u64) -> blake3::Hasher {
    let mut hasher = blake3::Hasher::new();
    hasher.update(challenge);
    hasher.update(&group.to_le_bytes());
    hasher.update(&pow.to_le_bytes());
    hasher
}

fn truncate(hasher: &blake3::Hasher) -> [u8; 16] {
    let mut key = [0u8; 16];
    key.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_matches_hash_prefix() {
        let challenge = [7u8; 32];
        let mut input = challenge.to_vec();
        input.extend_from_slice(&3u32.to_le_bytes());
        input.extend_from_slice(&99u64.to_le_bytes());
        let expected = blake3::hash(&input);
        assert_eq!(&group_key(&challenge, 3, 99), &expected.as_bytes()[..16]);

        input.extend_from_slice(&50u32.to_le_bytes());
        let expected = blake3::hash(&input);
        assert_eq!(&nonce_key(&challenge, 3, 99, 50), &expected.as_bytes()[..16]);
    }

    #[test]
    fn test_keys_depend_on_all_inputs() {
        let challenge = [1u8; 32];
        let base = group_key(&challenge, 0, 0);
        assert_ne!(base, group_key(&challenge, 1, 0));
        assert_ne!(base, group_key(&challenge, 0, 1));
        assert_ne!(base, group_key(&[2u8; 32], 0, 0));
        assert_ne!(nonce_key(&challenge, 0, 0, 1), nonce_key(&challenge, 0, 0, 2));
    }

    #[test]
    fn test_nonce_layout() {
        assert_eq!(group_of(15), 0);
        assert_eq!(group_of(16), 1);
        assert_eq!(nonce_at(2, 0), 32);
        assert_eq!(nonce_at(2, 15), 47);
        assert_eq!(nonce_at(2, 17), 33);
    }

    #[test]
    fn test_pow_input_layout() {
        let mut challenge = [0u8; 32];
        challenge[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let miner_id = [0xAB; 32];
        let input = pow_input(0x1_05, &challenge, &miner_id);
        assert_eq!(&input[..7], &[0u8; 7]);
        assert_eq!(input[7], 0x05);
        assert_eq!(&input[8..16], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&input[16..], &[0xAB; 32]);
    }
}
