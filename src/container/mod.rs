//! The `LBVM` binary container.
//!
//! ```text
//! "LBVM" | version: u8 | 3 reserved zero bytes
//! block*  where block = type: u8 | length: u32 LE | payload
//! ```
//!
//! Block types: 1 = code, 2 = symbol table, 255 = footer. The footer payload
//! is the 2-byte checksum of every byte between the header and the footer.
//! Symbol-table records are `index: u32 LE | length: u32 LE | UTF-8 bytes`,
//! with indices running 0, 1, 2, ...

use std::io::{self, Read, Write};

pub const MAGIC: [u8; 4] = *b"LBVM";
pub const VERSION: u8 = 1;

const BLOCK_CODE: u8 = 1;
const BLOCK_SYMBOLS: u8 = 2;
const BLOCK_FOOTER: u8 = 255;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not an LBVM container (bad magic)")]
    BadMagic,
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),
    #[error("checksum mismatch: computed {computed:02x?}, stored {stored:02x?}")]
    ChecksumMismatch { computed: [u8; 2], stored: [u8; 2] },
    #[error("footer payload must be 2 bytes, found {0}")]
    MalformedFooter(u32),
    #[error("malformed symbol table: {0}")]
    MalformedSymbolTable(String),
    #[error("unexpected block type {0}")]
    UnexpectedBlockType(u8),
    #[error("duplicate {0} block")]
    DuplicateBlock(&'static str),
    #[error("missing {0} block")]
    MissingBlock(&'static str),
    #[error("container ends before the footer")]
    Truncated,
    #[error("i/o error: {0}")]
    Io(io::Error),
}

impl FormatError {
    pub fn code(&self) -> &'static str {
        match self {
            FormatError::BadMagic | FormatError::UnsupportedVersion(_) => "LBVM-F001",
            FormatError::ChecksumMismatch { .. } | FormatError::MalformedFooter(_) => "LBVM-F002",
            FormatError::MalformedSymbolTable(_) => "LBVM-F003",
            FormatError::UnexpectedBlockType(_)
            | FormatError::DuplicateBlock(_)
            | FormatError::MissingBlock(_) => "LBVM-F004",
            FormatError::Truncated | FormatError::Io(_) => "LBVM-F005",
        }
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated
        } else {
            FormatError::Io(e)
        }
    }
}

// ── Checksum ────────────────────────────────────────────────────────────────

/// Two running bytes: a wrapping sum and an XOR.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    sum: u8,
    xor: u8,
}

impl Checksum {
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.sum = self.sum.wrapping_add(b);
            self.xor ^= b;
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.sum, self.xor]
    }
}

struct ChecksumReader<R> {
    inner: R,
    checksum: Checksum,
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.checksum.update(&buf[..n]);
        Ok(n)
    }
}

impl<R: Read> ChecksumReader<R> {
    fn byte(&mut self) -> io::Result<u8> {
        let mut b = [0];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn u32(&mut self) -> io::Result<u32> {
        let mut b = [0; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    /// Reads `len` bytes without trusting `len` for the allocation.
    fn payload(&mut self, len: u32) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::new();
        self.by_ref().take(u64::from(len)).read_to_end(&mut buf)?;
        if buf.len() != len as usize {
            return Err(FormatError::Truncated);
        }
        Ok(buf)
    }
}

// ── Write ───────────────────────────────────────────────────────────────────

fn push_block(out: &mut Vec<u8>, kind: u8, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "block exceeds 4 GiB"))?;
    out.push(kind);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

fn encode_symbols(symbols: &[String]) -> io::Result<Vec<u8>> {
    let too_large = || io::Error::new(io::ErrorKind::InvalidInput, "symbol table too large");
    let mut out = Vec::new();
    for (idx, name) in symbols.iter().enumerate() {
        let idx = u32::try_from(idx).map_err(|_| too_large())?;
        let len = u32::try_from(name.len()).map_err(|_| too_large())?;
        out.extend_from_slice(&idx.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
    }
    Ok(out)
}

/// Serialize a program as header, code block, symbol block and footer.
pub fn write<W: Write>(mut w: W, code: &[u8], symbols: &[String]) -> io::Result<()> {
    let mut body = Vec::with_capacity(code.len() + 64);
    push_block(&mut body, BLOCK_CODE, code)?;
    push_block(&mut body, BLOCK_SYMBOLS, &encode_symbols(symbols)?)?;
    let mut checksum = Checksum::default();
    checksum.update(&body);
    push_block(&mut body, BLOCK_FOOTER, &checksum.to_bytes())?;

    w.write_all(&MAGIC)?;
    w.write_all(&[VERSION, 0, 0, 0])?;
    w.write_all(&body)?;
    w.flush()?;
    tracing::debug!(bytes = body.len() + 8, "wrote container");
    Ok(())
}

// ── Read ────────────────────────────────────────────────────────────────────

/// Raw contents of a verified container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contents {
    pub code: Vec<u8>,
    pub symbols: Vec<String>,
}

/// Read and verify a container. Block payloads are only interpreted after the
/// footer checksum matches. Bytes after the footer are not read.
pub fn read<R: Read>(r: R) -> Result<Contents, FormatError> {
    let mut r = ChecksumReader { inner: r, checksum: Checksum::default() };

    let mut header = [0; 8];
    r.inner.read_exact(&mut header)?;
    if header[..4] != MAGIC {
        return Err(FormatError::BadMagic);
    }
    if header[4] != VERSION {
        return Err(FormatError::UnsupportedVersion(header[4]));
    }

    let mut code = None;
    let mut symbols = None;
    loop {
        let computed = r.checksum.to_bytes();
        let kind = r.byte()?;
        let len = r.u32()?;
        match kind {
            BLOCK_FOOTER => {
                if len != 2 {
                    return Err(FormatError::MalformedFooter(len));
                }
                let payload = r.payload(len)?;
                let stored = [payload[0], payload[1]];
                if stored != computed {
                    return Err(FormatError::ChecksumMismatch { computed, stored });
                }
                break;
            }
            BLOCK_CODE => {
                if code.is_some() {
                    return Err(FormatError::DuplicateBlock("code"));
                }
                code = Some(r.payload(len)?);
            }
            BLOCK_SYMBOLS => {
                if symbols.is_some() {
                    return Err(FormatError::DuplicateBlock("symbol table"));
                }
                symbols = Some(r.payload(len)?);
            }
            other => return Err(FormatError::UnexpectedBlockType(other)),
        }
    }

    let code = code.ok_or(FormatError::MissingBlock("code"))?;
    let symbols = decode_symbols(&symbols.ok_or(FormatError::MissingBlock("symbol table"))?)?;
    tracing::debug!(code = code.len(), symbols = symbols.len(), "read container");
    Ok(Contents { code, symbols })
}

fn decode_symbols(raw: &[u8]) -> Result<Vec<String>, FormatError> {
    let truncated = || FormatError::MalformedSymbolTable("truncated record".into());
    let mut symbols = Vec::new();
    let mut rest = raw;
    while !rest.is_empty() {
        let (idx, after) = rest.split_first_chunk::<4>().ok_or_else(truncated)?;
        let (len, after) = after.split_first_chunk::<4>().ok_or_else(truncated)?;
        let (idx, len) = (u32::from_le_bytes(*idx), u32::from_le_bytes(*len) as usize);
        if after.len() < len {
            return Err(truncated());
        }
        let (name, after) = after.split_at(len);
        if idx as usize != symbols.len() {
            return Err(FormatError::MalformedSymbolTable(format!(
                "entry {} carries index {idx}",
                symbols.len()
            )));
        }
        let name = String::from_utf8(name.to_vec()).map_err(|_| {
            FormatError::MalformedSymbolTable(format!("symbol #{idx} is not valid UTF-8"))
        })?;
        symbols.push(name);
        rest = after;
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut out = Vec::new();
        let code = [0x02, 5, 0, 0, 0, 0x03, 0, 0, 0, 0, 0x00];
        write(&mut out, &code, &["n".to_string(), "λ".to_string()]).unwrap();
        out
    }

    #[test]
    fn header_layout() {
        let bytes = sample();
        assert_eq!(&bytes[..8], b"LBVM\x01\x00\x00\x00");
        assert_eq!(bytes[8], BLOCK_CODE);
        assert_eq!(&bytes[9..13], &11u32.to_le_bytes());
    }

    #[test]
    fn read_back_what_was_written() {
        let contents = read(&sample()[..]).unwrap();
        assert_eq!(contents.code.len(), 11);
        assert_eq!(contents.symbols, vec!["n", "λ"]);
    }

    #[test]
    fn every_payload_bit_flip_is_detected() {
        let bytes = sample();
        // code payload 13..24, symbol header at 24..29, symbol payload after
        let symbol_payload = 29..bytes.len() - 7;
        for i in (13..24).chain(symbol_payload) {
            for bit in 0..8 {
                let mut corrupt = bytes.clone();
                corrupt[i] ^= 1 << bit;
                assert!(
                    matches!(read(&corrupt[..]), Err(FormatError::ChecksumMismatch { .. })),
                    "flip of bit {bit} in byte {i} went unnoticed"
                );
            }
        }
    }

    #[test]
    fn every_bit_flip_after_the_header_is_rejected() {
        // block types and lengths included: those surface as structural errors
        let bytes = sample();
        for i in 8..bytes.len() {
            for bit in 0..8 {
                let mut corrupt = bytes.clone();
                corrupt[i] ^= 1 << bit;
                assert!(read(&corrupt[..]).is_err(), "flip of bit {bit} in byte {i} was accepted");
            }
        }
    }

    #[test]
    fn bad_magic_and_version() {
        let mut bytes = sample();
        bytes[0] = b'X';
        assert!(matches!(read(&bytes[..]), Err(FormatError::BadMagic)));
        let mut bytes = sample();
        bytes[4] = 2;
        assert!(matches!(read(&bytes[..]), Err(FormatError::UnsupportedVersion(2))));
    }

    #[test]
    fn unknown_block_type() {
        let mut bytes = sample();
        bytes[8] = 7;
        assert!(matches!(read(&bytes[..]), Err(FormatError::UnexpectedBlockType(7))));
    }

    #[test]
    fn truncated_container() {
        let bytes = sample();
        let err = read(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated));
        assert_eq!(err.code(), "LBVM-F005");
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = sample();
        bytes.extend_from_slice(b"garbage");
        assert!(read(&bytes[..]).is_ok());
    }

    fn with_symbol_payload(payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        push_block(&mut body, BLOCK_CODE, &[0x00]).unwrap();
        push_block(&mut body, BLOCK_SYMBOLS, payload).unwrap();
        let mut ck = Checksum::default();
        ck.update(&body);
        push_block(&mut body, BLOCK_FOOTER, &ck.to_bytes()).unwrap();
        let mut out = b"LBVM\x01\x00\x00\x00".to_vec();
        out.extend(body);
        out
    }

    #[test]
    fn symbol_index_must_match_position() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.push(b'x');
        let err = read(&with_symbol_payload(&payload)[..]).unwrap_err();
        assert!(matches!(err, FormatError::MalformedSymbolTable(_)), "{err}");
    }

    #[test]
    fn truncated_symbol_record() {
        let err = read(&with_symbol_payload(&[0, 0, 0])[..]).unwrap_err();
        assert!(matches!(err, FormatError::MalformedSymbolTable(_)));
    }

    #[test]
    fn missing_symbol_block() {
        let mut body = Vec::new();
        push_block(&mut body, BLOCK_CODE, &[0x00]).unwrap();
        let mut ck = Checksum::default();
        ck.update(&body);
        push_block(&mut body, BLOCK_FOOTER, &ck.to_bytes()).unwrap();
        let mut bytes = b"LBVM\x01\x00\x00\x00".to_vec();
        bytes.extend(body);
        assert!(matches!(read(&bytes[..]), Err(FormatError::MissingBlock(_))));
    }
}
