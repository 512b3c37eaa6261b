//! Parsing for access-trace files.
//!
//! ## Syntax
//!
//! One operation per line:
//!
//! - Reads: `<cache-id> r <width> <address>`, e.g. `0 r w 0x40`
//! - Writes: `<cache-id> w <width> <address> <value>`, e.g. `1 w b 0x41 0xFF`
//! - Widths: `b` (byte), `h` (half-word), `w` (word), `d` (double-word)
//! - Comments: `#` to end of line
//! - Literals: decimal or `0x` hex

use std::fmt;

use moesi_core::{AccessWidth, CacheId};
use thiserror::Error;

/// One parsed trace operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOp {
    /// Read `width` bytes at `address` through cache `id`.
    Read {
        /// Issuing processor.
        id: CacheId,
        /// Access width.
        width: AccessWidth,
        /// First byte of the access.
        address: u32,
    },
    /// Write `value` as `width` bytes at `address` through cache `id`.
    Write {
        /// Issuing processor.
        id: CacheId,
        /// Access width.
        width: AccessWidth,
        /// First byte of the access.
        address: u32,
        /// Value to store, already checked to fit the width.
        value: u64,
    },
}

impl TraceOp {
    /// Issuing processor.
    #[must_use]
    pub const fn id(&self) -> CacheId {
        match self {
            Self::Read { id, .. } | Self::Write { id, .. } => *id,
        }
    }

    /// Access width.
    #[must_use]
    pub const fn width(&self) -> AccessWidth {
        match self {
            Self::Read { width, .. } | Self::Write { width, .. } => *width,
        }
    }

    /// First byte of the access.
    #[must_use]
    pub const fn address(&self) -> u32 {
        match self {
            Self::Read { address, .. } | Self::Write { address, .. } => *address,
        }
    }
}

impl fmt::Display for TraceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = width_letter(self.width());
        match self {
            Self::Read { id, address, .. } => write!(f, "cache {id} read {letter} {address:#x}"),
            Self::Write {
                id, address, value, ..
            } => write!(f, "cache {id} write {letter} {address:#x} {value:#x}"),
        }
    }
}

const fn width_letter(width: AccessWidth) -> char {
    match width {
        AccessWidth::Byte => 'b',
        AccessWidth::HalfWord => 'h',
        AccessWidth::Word => 'w',
        AccessWidth::DoubleWord => 'd',
    }
}

/// A trace operation with its 1-indexed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine {
    /// Line number in the trace file.
    pub line: usize,
    /// The operation on that line.
    pub op: TraceOp,
}

/// Error parsing a trace line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message} (in '{text}')")]
pub struct TraceError {
    /// 1-indexed line number.
    pub line: usize,
    /// The offending text, comment stripped.
    pub text: String,
    /// Description of the problem.
    pub message: String,
}

/// Parses a whole trace.
///
/// # Errors
///
/// Returns the first [`TraceError`] encountered.
pub fn parse_trace(content: &str) -> Result<Vec<TraceLine>, TraceError> {
    let mut ops = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let stripped = strip_comment(line).trim();
        if stripped.is_empty() {
            continue;
        }
        let op = parse_op(stripped).map_err(|message| TraceError {
            line: idx + 1,
            text: stripped.to_string(),
            message,
        })?;
        ops.push(TraceLine { line: idx + 1, op });
    }
    Ok(ops)
}

fn strip_comment(line: &str) -> &str {
    line.find('#').map_or(line, |pos| &line[..pos])
}

fn parse_op(text: &str) -> Result<TraceOp, String> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let [id, kind, width, address, rest @ ..] = parts.as_slice() else {
        return Err("expected '<cache-id> <r|w> <width> <address>'".to_string());
    };

    let id = u8::try_from(parse_number(id)?)
        .map(CacheId)
        .map_err(|_| format!("cache id '{id}' does not fit in 8 bits"))?;
    let width = parse_width(width)?;
    let address = u32::try_from(parse_number(address)?)
        .map_err(|_| format!("address '{address}' does not fit in 32 bits"))?;

    match (*kind, rest) {
        ("r" | "R", []) => Ok(TraceOp::Read { id, width, address }),
        ("w" | "W", [value]) => {
            let parsed = parse_number(value)?;
            if width != AccessWidth::DoubleWord && parsed >> (width.bytes() * 8) != 0 {
                return Err(format!("value '{value}' does not fit in {} bytes", width.bytes()));
            }
            Ok(TraceOp::Write {
                id,
                width,
                address,
                value: parsed,
            })
        }
        ("r" | "R", _) => Err("reads take no value".to_string()),
        ("w" | "W", _) => Err("writes take exactly one value".to_string()),
        (other, _) => Err(format!("unknown operation '{other}', expected 'r' or 'w'")),
    }
}

fn parse_width(text: &str) -> Result<AccessWidth, String> {
    let mut chars = text.chars();
    let width = match (chars.next(), chars.next()) {
        (Some(letter), None) => AccessWidth::from_letter(letter),
        _ => None,
    };
    width.ok_or_else(|| format!("unknown width '{text}', expected b, h, w or d"))
}

fn parse_number(text: &str) -> Result<u64, String> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|_| format!("invalid hex value '{text}'"))
    } else {
        text.parse::<u64>()
            .map_err(|_| format!("invalid decimal value '{text}'"))
    }
}
