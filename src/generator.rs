use crate::error::{Error, Result};
use crate::structs::{IpPattern, Octet};
use crate::validation;

use pnet::util::MacAddr;
use rand_mt::Mt19937GenRand32;
use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seeded source of every random value of a generation session.
///
/// The stream is a 32-bit Mersenne Twister keyed by the 32-bit words of the seed, and bounded
/// integers are drawn by rejection sampling on the bit length of the range. A given seed
/// therefore always yields the same sequence of values, whatever the call sites are.
#[derive(Debug, Clone)]
pub struct Generator {
    seed: u64,
    rng: Mt19937GenRand32,
}

impl Generator {
    /// Create a generator. Without a seed, the current UNIX time (in seconds) is used.
    pub fn new(seed: Option<u64>) -> Result<Self> {
        let seed = match seed {
            Some(s) => validation::validate_seed(s)?,
            None => clock_seed(),
        };
        let mut key = vec![seed as u32];
        if seed >> 32 != 0 {
            key.push((seed >> 32) as u32);
        }
        log::trace!("Generator seeded with {seed}");
        Ok(Generator {
            seed,
            rng: Mt19937GenRand32::new_with_key(key),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer of k bits, least significant 32-bit word first
    fn random_bits(&mut self, mut k: u32) -> u128 {
        let mut r: u128 = 0;
        let mut shift = 0;
        while k > 0 {
            let mut word = self.rng.next_u32();
            if k < 32 {
                word >>= 32 - k;
            }
            r |= (word as u128) << shift;
            shift += 32;
            k = k.saturating_sub(32);
        }
        r
    }

    /// Uniform integer in [0, n)
    fn below(&mut self, n: u128) -> u128 {
        let k = u128::BITS - n.leading_zeros();
        let mut r = self.random_bits(k);
        while r >= n {
            r = self.random_bits(k);
        }
        r
    }

    /// Uniform integer in [min, max], both bounds included
    pub fn uniform_int(&mut self, min: i64, max: i64) -> Result<i64> {
        if min > max {
            return Err(Error::InvalidRange { min, max });
        }
        let width = (max as i128 - min as i128 + 1) as u128;
        Ok((min as i128 + self.below(width) as i128) as i64)
    }

    /// Uniform integer of n bits, i.e., in [0, 2^n - 1]. Header fields are at most 32 bits
    /// wide: a larger width is clamped to 32.
    pub fn bit_width(&mut self, n: u32) -> u64 {
        let width = 1u128 << n.min(32);
        self.below(width) as u64
    }

    pub fn boolean(&mut self) -> bool {
        self.below(2) == 1
    }

    /// Uniform index in [0, length)
    pub fn index(&mut self, length: usize) -> Result<usize> {
        if length == 0 {
            return Err(Error::EmptyChoice);
        }
        Ok(self.below(length as u128) as usize)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T> {
        let i = self.index(items.len())?;
        Ok(&items[i])
    }

    /// Replace each wildcard octet of the pattern by an 8-bit draw
    pub fn mask(&mut self, pattern: &IpPattern) -> Ipv4Addr {
        let mut bytes = [0u8; 4];
        for (b, o) in bytes.iter_mut().zip(pattern.octets.iter()) {
            *b = match o {
                Octet::Literal(v) => *v,
                Octet::Wildcard => self.bit_width(8) as u8,
            };
        }
        Ipv4Addr::from(bytes)
    }

    /// Same as `mask`, from the textual pattern
    pub fn masked_ip(&mut self, pattern: &str) -> Result<Ipv4Addr> {
        let pattern = validation::parse_ip_pattern(pattern)?;
        Ok(self.mask(&pattern))
    }

    /// A MAC address with a null first octet and five random octets
    pub fn random_mac(&mut self) -> MacAddr {
        let mut octets = [0u8; 5];
        for o in octets.iter_mut() {
            *o = self.bit_width(8) as u8;
        }
        let [b, c, d, e, f] = octets;
        MacAddr::new(0, b, c, d, e, f)
    }

    /// Fill the buffer with random bytes, one 8-bit draw per byte
    pub fn fill_bytes(&mut self, buffer: &mut [u8]) {
        for b in buffer.iter_mut() {
            *b = self.bit_width(8) as u8;
        }
    }
}

/// The current UNIX time in seconds, used when no seed is given
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
