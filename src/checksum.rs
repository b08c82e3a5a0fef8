//! Checksum algorithms for message integrity
//!
//! Algorithms are named in schemas by id (`"crc16-ccitt"`, `"sum8"`, ...) and
//! resolved with [`ChecksumAlgorithm::for_id`]. Each has a fixed output width,
//! which a checksum field must declare exactly.
//!
//! The CRC variants use their common parameterizations:
//!
//! | id            | poly         | init         | reflected | xor-out      | check (`"123456789"`) |
//! |---------------|--------------|--------------|-----------|--------------|-----------------------|
//! | `crc8`        | `0x07`       | `0x00`       | no        | `0x00`       | `0xf4`                |
//! | `crc16-ccitt` | `0x1021`     | `0xffff`     | no        | `0x0000`     | `0x29b1`              |
//! | `crc32`       | `0x04c11db7` | `0xffffffff` | yes       | `0xffffffff` | `0xcbf43926`          |
//! | `crc32c`      | `0x1edc6f41` | `0xffffffff` | yes       | `0xffffffff` | `0xe3069283`          |

use std::fmt::{Display, Formatter};

/// Reflected CRC-32 (IEEE 802.3) polynomial
const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Reflected CRC-32C (Castagnoli) polynomial
const CRC32C_POLYNOMIAL: u32 = 0x82F6_3B78;

const CRC16_CCITT_POLYNOMIAL: u16 = 0x1021;

const CRC8_POLYNOMIAL: u8 = 0x07;

static CRC32_TABLE: [u32; 256] = reflected_table(CRC32_POLYNOMIAL);
static CRC32C_TABLE: [u32; 256] = reflected_table(CRC32C_POLYNOMIAL);
static CRC16_TABLE: [u16; 256] = crc16_table(CRC16_CCITT_POLYNOMIAL);
static CRC8_TABLE: [u8; 256] = crc8_table(CRC8_POLYNOMIAL);

const fn reflected_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Supported checksum algorithms
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// Sum of all bytes, modulo 2^8
    Sum8,
    /// Sum of all bytes, modulo 2^16
    Sum16,
    /// Exclusive-or of all bytes
    Xor8,
    /// BSD `sum(1)` rotating 16-bit checksum
    Bsd16,
    Crc8,
    Crc16Ccitt,
    Crc32,
    Crc32c,
}

impl ChecksumAlgorithm {
    pub const ALL: [ChecksumAlgorithm; 8] = [
        ChecksumAlgorithm::Sum8,
        ChecksumAlgorithm::Sum16,
        ChecksumAlgorithm::Xor8,
        ChecksumAlgorithm::Bsd16,
        ChecksumAlgorithm::Crc8,
        ChecksumAlgorithm::Crc16Ccitt,
        ChecksumAlgorithm::Crc32,
        ChecksumAlgorithm::Crc32c,
    ];

    /// Resolves an algorithm id, ignoring ASCII case.
    #[must_use]
    pub fn for_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.id().eq_ignore_ascii_case(id))
    }

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sum8 => "sum8",
            ChecksumAlgorithm::Sum16 => "sum16",
            ChecksumAlgorithm::Xor8 => "xor8",
            ChecksumAlgorithm::Bsd16 => "bsd16",
            ChecksumAlgorithm::Crc8 => "crc8",
            ChecksumAlgorithm::Crc16Ccitt => "crc16-ccitt",
            ChecksumAlgorithm::Crc32 => "crc32",
            ChecksumAlgorithm::Crc32c => "crc32c",
        }
    }

    /// Width of the checksum value in bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            ChecksumAlgorithm::Sum8 | ChecksumAlgorithm::Xor8 | ChecksumAlgorithm::Crc8 => 8,
            ChecksumAlgorithm::Sum16 | ChecksumAlgorithm::Bsd16 | ChecksumAlgorithm::Crc16Ccitt => 16,
            ChecksumAlgorithm::Crc32 | ChecksumAlgorithm::Crc32c => 32,
        }
    }

    /// Initial register value used when a schema does not override it
    #[must_use]
    pub const fn default_start(self) -> u64 {
        match self {
            ChecksumAlgorithm::Crc16Ccitt => 0xffff,
            ChecksumAlgorithm::Crc32 | ChecksumAlgorithm::Crc32c => 0xffff_ffff,
            _ => 0,
        }
    }

    /// Computes the checksum of `data`, with `start` replacing the default
    /// initial register value when given.
    ///
    /// The result always fits in [`bits`](Self::bits) bits.
    #[must_use]
    pub fn compute(self, data: &[u8], start: Option<u64>) -> u64 {
        let init = start.unwrap_or_else(|| self.default_start());
        match self {
            ChecksumAlgorithm::Sum8 => data
                .iter()
                .fold(init as u8, |acc, &b| acc.wrapping_add(b))
                .into(),
            ChecksumAlgorithm::Sum16 => data
                .iter()
                .fold(init as u16, |acc, &b| acc.wrapping_add(b.into()))
                .into(),
            ChecksumAlgorithm::Xor8 => data.iter().fold(init as u8, |acc, &b| acc ^ b).into(),
            ChecksumAlgorithm::Bsd16 => data
                .iter()
                .fold(init as u16, |acc, &b| acc.rotate_right(1).wrapping_add(b.into()))
                .into(),
            ChecksumAlgorithm::Crc8 => data
                .iter()
                .fold(init as u8, |crc, &b| CRC8_TABLE[(crc ^ b) as usize])
                .into(),
            ChecksumAlgorithm::Crc16Ccitt => data
                .iter()
                .fold(init as u16, |crc, &b| {
                    (crc << 8) ^ CRC16_TABLE[((crc >> 8) as u8 ^ b) as usize]
                })
                .into(),
            ChecksumAlgorithm::Crc32 => reflected_crc32(&CRC32_TABLE, init as u32, data).into(),
            ChecksumAlgorithm::Crc32c => reflected_crc32(&CRC32C_TABLE, init as u32, data).into(),
        }
    }
}

fn reflected_crc32(table: &[u32; 256], init: u32, data: &[u8]) -> u32 {
    let crc = data.iter().fold(init, |crc, &b| {
        table[((crc ^ b as u32) & 0xff) as usize] ^ (crc >> 8)
    });
    !crc
}

impl Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
