//! Whitening and checksum transform used by the 9-byte V2 packets
//!
//! Byte 0 is the key in the clear. Bytes 1..=7 are XOR-whitened with a key
//! derived nibble-wise from byte 0 and shifted by a per-position offset. Byte 8
//! carries a whitened checksum of the plain payload.

/// Length of every V2 packet
pub const V2_PACKET_LEN: usize = 9;

const OFFSET_JUMP_START: u8 = 0x54;

const OFFSETS: [[u8; 4]; 8] = [
    [0x45, 0x1F, 0x14, 0x5C],
    [0x2B, 0xC9, 0xE3, 0x11],
    [0x6D, 0x5F, 0x8A, 0x2B],
    [0xAF, 0x03, 0x1D, 0xF3],
    [0x1A, 0xE2, 0xF0, 0xD1],
    [0x04, 0xD8, 0x71, 0x42],
    [0xAF, 0x04, 0xDD, 0x07],
    [0x61, 0x13, 0x38, 0x64],
];

fn offset(index: usize, key: u8, jump_start: u8) -> u8 {
    let base = OFFSETS[index - 1][(key % 4) as usize];
    let jumped = jump_start > 0 && key >= jump_start && (key as u16) < jump_start as u16 + 0x80;
    if jumped {
        base.wrapping_add(0x80)
    } else {
        base
    }
}

/// Derive the XOR key from the clear key byte
pub fn xor_key(key: u8) -> u8 {
    let shift = if key & 0x0F < 0x04 { 0 } else { 1 };
    let x = ((key >> 4) + shift + 6) % 8;
    let msn = (((4 + x) ^ 1) & 0x0F) << 4;
    let lsn = (((key & 0x0F) + 4) ^ 2) & 0x0F;
    msn | lsn
}

fn encode_byte(byte: u8, s1: u8, xor: u8, s2: u8) -> u8 {
    (byte.wrapping_add(s1) ^ xor).wrapping_add(s2)
}

fn decode_byte(byte: u8, s1: u8, xor: u8, s2: u8) -> u8 {
    (byte.wrapping_sub(s2) ^ xor).wrapping_sub(s1)
}

/// Checksum of a plain packet (key plus bytes 1..=7)
pub fn checksum(plain: &[u8; V2_PACKET_LEN]) -> u8 {
    plain[1..=7]
        .iter()
        .fold(xor_key(plain[0]), |sum, b| sum.wrapping_add(*b))
}

/// Whiten a plain packet in place, filling in the checksum byte
pub fn encode(packet: &mut [u8; V2_PACKET_LEN]) {
    let key = packet[0];
    let xor = xor_key(key);
    let sum = checksum(packet);

    for i in 1..=7 {
        packet[i] = encode_byte(packet[i], 0, xor, offset(i, key, OFFSET_JUMP_START));
    }
    packet[8] = encode_byte(sum, 2, xor, offset(8, key, 0));
}

/// Undo [`encode`] in place; byte 8 becomes the plain checksum
pub fn decode(packet: &mut [u8; V2_PACKET_LEN]) {
    let key = packet[0];
    let xor = xor_key(key);

    for i in 1..=7 {
        packet[i] = decode_byte(packet[i], 0, xor, offset(i, key, OFFSET_JUMP_START));
    }
    packet[8] = decode_byte(packet[8], 2, xor, offset(8, key, 0));
}

/// Decode a copy of `bytes`, or `None` if it is not 9 bytes long
pub fn decoded(bytes: &[u8]) -> Option<[u8; V2_PACKET_LEN]> {
    let mut packet: [u8; V2_PACKET_LEN] = bytes.try_into().ok()?;
    decode(&mut packet);
    Some(packet)
}
