//! Arcfour (RC4) stream cipher.
//!
//! Used by the standard security handler. The cipher keeps its keystream
//! state between calls, so one instance can decrypt a stream chunk by
//! chunk.

/// RC4 stream cipher with a 1-256 byte key.
pub struct Arcfour {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Arcfour {
    /// Create a new cipher keyed with `key` (1-256 bytes).
    pub fn new(key: &[u8]) -> Self {
        assert!(
            !key.is_empty() && key.len() <= 256,
            "RC4 key must be 1-256 bytes"
        );

        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);

        // Key-scheduling algorithm (KSA)
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Self { state, i: 0, j: 0 }
    }

    /// Encrypt/decrypt data (RC4 is symmetric). Keystream state advances,
    /// so successive calls continue where the previous one stopped.
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|byte| byte ^ self.prga()).collect()
    }

    /// Pseudo-random generation algorithm (PRGA).
    fn prga(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);

        let idx = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[idx as usize]
    }
}
