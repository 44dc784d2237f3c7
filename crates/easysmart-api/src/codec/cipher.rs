// Whole-frame obfuscation.
//
// Every frame on the wire is XORed with an RC4 keystream derived from a
// fixed key shipped in the vendor's management utility. The keystream is
// restarted for each frame, so the transform is its own inverse.

const KEY: &[u8; 256] = b"Ei2HNryt8ysSdRRI54XNQHBEbOIRqNjQgYxsTmuW3srSVRVFyLh8mwvhBLPFQph3\
ecDMLnDtjDUdrUwt7oTsJuYl72hXESNiD6jFIQCtQN1unsmn3JXjeYwGJ55pqTkV\
yN2OOm3vekF6G1LM4t3kiiG4lGwbxG4CG1s5Sli7gcINFBOLXQnPpsQNWDmPbOm7\
4mE7eyR3L7tk8tUhI17FLKm11hrrd1ck74bMw3VYSK3X5RrDgXelewMU6o1tJ3iX";

struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    fn new(key: &[u8]) -> Self {
        let mut state = [0u8; 256];
        for (slot, value) in state.iter_mut().zip(0u8..=255) {
            *slot = value;
        }
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j
                .wrapping_add(state[i])
                .wrapping_add(key[i % key.len()]);
            state.swap(i, usize::from(j));
        }
        Self { state, i: 0, j: 0 }
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[usize::from(self.i)]);
        self.state.swap(usize::from(self.i), usize::from(self.j));
        let idx = self.state[usize::from(self.i)].wrapping_add(self.state[usize::from(self.j)]);
        self.state[usize::from(idx)]
    }
}

/// Apply the frame transform in place. Calling it twice restores the input.
pub fn apply(data: &mut [u8]) {
    let mut rc4 = Rc4::new(KEY);
    for byte in data {
        *byte ^= rc4.next_byte();
    }
}

/// Obfuscate a plain frame.
pub fn encode(plain: &[u8]) -> Vec<u8> {
    let mut out = plain.to_vec();
    apply(&mut out);
    out
}

/// Remove the obfuscation from a received frame.
pub fn decode(wire: &[u8]) -> Vec<u8> {
    encode(wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_full_length() {
        assert_eq!(KEY.len(), 256);
        assert!(KEY.starts_with(b"Ei2HNryt"));
        assert!(KEY.ends_with(b"o1tJ3iX"));
    }

    #[test]
    fn transform_is_an_involution() {
        let plain: Vec<u8> = (0..=255).collect();
        let wire = encode(&plain);
        assert_ne!(wire, plain);
        assert_eq!(decode(&wire), plain);
    }

    #[test]
    fn keystream_restarts_per_frame() {
        let a = encode(&[0u8; 8]);
        let b = encode(&[0u8; 8]);
        assert_eq!(a, b);
    }

    #[test]
    fn first_header_bytes_match_capture() {
        // Version 1, op GET: the first two bytes of every captured GET request.
        assert_eq!(encode(&[0x01, 0x01]), vec![0x5d, 0x75]);
    }
}
