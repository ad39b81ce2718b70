//! Versioned binary format of grammar tables
//!
//! ```text
//! +--------+-----------------+----------------------------+
//! | "GRVE" | version: u32 LE | bincode(GrammarTables)     |
//! +--------+-----------------+----------------------------+
//! ```
//!
//! The header is checked by hand so that a version mismatch is reported before
//! the body is interpreted. The body is decoded with a size limit and then
//! validated structurally.

use bincode::Options;

use super::error::LoadError;
use super::tables::GrammarTables;

pub const MAGIC: &[u8; 4] = b"GRVE";

/// Format version written by this runtime
pub const LANGUAGE_VERSION: u32 = 14;

/// Oldest format version this runtime still reads
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 13;

const HEADER_LEN: usize = 8;

/// Upper bound on decoded table size, relative to the blob size
const DECODE_EXPANSION_LIMIT: u64 = 64;

/// Serialize tables into a blob carrying the current format version
pub fn encode(tables: &GrammarTables) -> Result<Vec<u8>, LoadError> {
    encode_with_version(tables, LANGUAGE_VERSION)
}

pub(crate) fn encode_with_version(
    tables: &GrammarTables,
    version: u32,
) -> Result<Vec<u8>, LoadError> {
    let body = bincode::DefaultOptions::new()
        .serialize(tables)
        .map_err(|err| LoadError::malformed(format!("unencodable tables: {err}")))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&version.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Read the format version from a blob header
pub fn read_version(bytes: &[u8]) -> Result<u32, LoadError> {
    if bytes.len() < HEADER_LEN {
        return Err(LoadError::malformed(format!(
            "blob of {} bytes is shorter than the header",
            bytes.len()
        )));
    }
    if &bytes[..4] != MAGIC {
        return Err(LoadError::malformed("bad magic number"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_LEN]);
    Ok(u32::from_le_bytes(version))
}

/// Decode and validate a blob
pub fn decode(bytes: &[u8]) -> Result<(u32, GrammarTables), LoadError> {
    let version = read_version(bytes)?;
    if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
        return Err(LoadError::VersionMismatch {
            found: version,
            min: MIN_COMPATIBLE_LANGUAGE_VERSION,
            max: LANGUAGE_VERSION,
        });
    }

    let body = &bytes[HEADER_LEN..];
    let limit = (body.len() as u64).saturating_mul(DECODE_EXPANSION_LIMIT).max(1024);
    let tables: GrammarTables = bincode::DefaultOptions::new()
        .with_limit(limit)
        .reject_trailing_bytes()
        .deserialize(body)
        .map_err(|err| LoadError::malformed(format!("undecodable table body: {err}")))?;
    tables.validate()?;
    Ok((version, tables))
}
