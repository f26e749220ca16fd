/// Encode path with compact (hex-prefix) encoding
/// First nibble contains: odd_flag (bit 0) and leaf_flag (bit 1)
pub fn encode_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd_len = nibbles.len() % 2 == 1;
    let flag: u8 = if is_leaf { 0x2 } else { 0x0 };

    let mut encoded = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd_len {
        encoded.push(((flag | 0x1) << 4) | nibbles[0]);
        &nibbles[1..]
    } else {
        encoded.push(flag << 4);
        nibbles
    };
    encoded.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
    encoded
}

/// Decode compact-encoded path
/// Returns (nibbles, is_leaf), or `None` when the flag nibble is invalid
pub fn decode_path(encoded: &[u8]) -> Option<(Vec<u8>, bool)> {
    let (&first, rest) = encoded.split_first()?;
    let flag = first >> 4;
    if flag > 0x3 {
        return None;
    }
    let is_leaf = flag & 0x2 != 0;
    let odd_len = flag & 0x1 != 0;

    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if odd_len {
        nibbles.push(first & 0x0f);
    } else if first & 0x0f != 0 {
        // even paths pad the flag byte with a zero nibble
        return None;
    }
    nibbles.extend(to_nibbles(rest));

    Some((nibbles, is_leaf))
}

/// Convert bytes to nibbles (hex digits)
pub fn to_nibbles(data: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Length of the shared prefix of two nibble paths
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
