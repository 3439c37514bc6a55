//! JR-100 user program formats.
//!
//! Two on-disk shapes: the PROG binary container (versions 1 and 2,
//! little-endian) and plain BASIC text with `\HH` byte escapes. Loaders
//! write straight into machine memory through the bus so display mirrors
//! stay current; failures surface as [`ProgramLoadError`] and never roll
//! back bytes already written.

use std::error::Error;
use std::fmt;

use jr100_core::core::Bus;

pub const BASIC_START_ADDRESS: u16 = 0x0246;
pub const BASIC_POINTER_BASE: u16 = 0x0006;
pub const BASIC_POINTER_COUNT: u16 = 4;
pub const BASIC_TERMINATOR: u8 = 0xDF;
/// Line number word plus content, excluding the 0x00 terminator.
pub const MAX_BASIC_LINE_LENGTH: usize = 72;
/// BASIC programs must stay below the extended-RAM ceiling.
const BASIC_END_ADDRESS: u16 = 0x7FFF;

const PROG_MAGIC: &[u8; 4] = b"PROG";
pub const MAX_PROGRAM_NAME_LENGTH: usize = 256;
pub const MAX_PROGRAM_LENGTH: usize = 65536;
pub const MAX_COMMENT_LENGTH: usize = 1024;
pub const MAX_BINARY_SECTIONS: usize = 256;

const SECTION_PNAM: u32 = 0x4D41_4E50; // "PNAM"
const SECTION_PBAS: u32 = 0x5341_4250; // "PBAS"
const SECTION_PBIN: u32 = 0x4E49_4250; // "PBIN"
const SECTION_CMNT: u32 = 0x544E_4D43; // "CMNT"

#[derive(Debug)]
pub enum ProgramLoadError {
    InvalidMagic,
    UnsupportedVersion(u32),
    UnexpectedEof,
    /// A length-prefixed field exceeds its documented limit.
    FieldTooLarge(&'static str),
    /// A section's internal lengths are inconsistent.
    InvalidSection(&'static str),
    InvalidString(&'static str),
    /// Payload would extend past the 64 KiB address space.
    ProgramTooLarge,
    MissingLineNumber(String),
    InvalidLineNumber { number: i64, line: String },
    InvalidEscape(String),
    LineTooLong(String),
    UnsupportedFormat(String),
    Io(std::io::Error),
}

impl fmt::Display for ProgramLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid PROG magic"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported PROG version: {version}")
            }
            Self::UnexpectedEof => write!(f, "unexpected end of file"),
            Self::FieldTooLarge(what) => write!(f, "{what} length out of range"),
            Self::InvalidSection(section) => write!(f, "invalid {section} section"),
            Self::InvalidString(what) => write!(f, "{what} is not valid UTF-8"),
            Self::ProgramTooLarge => write!(f, "program exceeds PROG limits"),
            Self::MissingLineNumber(line) => write!(f, "line number missing: {line}"),
            Self::InvalidLineNumber { number, line } => {
                write!(f, "invalid line number {number}: {line}")
            }
            Self::InvalidEscape(line) => write!(f, "invalid escape in line: {line}"),
            Self::LineTooLong(line) => write!(f, "line too long: {line}"),
            Self::UnsupportedFormat(extension) => {
                write!(f, "unsupported program format: {extension}")
            }
            Self::Io(error) => write!(f, "I/O error: {error}"),
        }
    }
}

impl Error for ProgramLoadError {}

impl From<std::io::Error> for ProgramLoadError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

/// A memory range populated by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRegion {
    pub start: u16,
    pub end: u16,
    pub comment: String,
}

/// Metadata describing a loaded program.
#[derive(Debug, Clone, Default)]
pub struct ProgramInfo {
    pub name: String,
    pub comment: String,
    pub basic_area: bool,
    pub regions: Vec<AddressRegion>,
}

impl ProgramInfo {
    fn add_region(&mut self, start: u16, end: u16, comment: &str) {
        self.regions.push(AddressRegion {
            start,
            end,
            comment: comment.to_string(),
        });
    }
}

/// A binary payload for the PROG v2 writer.
pub struct ProgBinary<'a> {
    pub start: u16,
    pub data: &'a [u8],
    pub comment: &'a str,
}

// ---------------------------------------------------------------------
// Little-endian slice reader
// ---------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ProgramLoadError> {
        let slice = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or(ProgramLoadError::UnexpectedEof)?;
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, ProgramLoadError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Length-prefixed UTF-8 string with a size cap.
    fn read_utf8(&mut self, max: usize, what: &'static str) -> Result<String, ProgramLoadError> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(ProgramLoadError::FieldTooLarge(what));
        }
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProgramLoadError::InvalidString(what))
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn utf8(bytes: &[u8], what: &'static str) -> Result<String, ProgramLoadError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ProgramLoadError::InvalidString(what))
}

// ---------------------------------------------------------------------
// PROG reader
// ---------------------------------------------------------------------

/// Load a PROG container (v1 or v2) into memory.
pub fn load_prog<B: Bus + ?Sized>(
    bus: &mut B,
    data: &[u8],
) -> Result<ProgramInfo, ProgramLoadError> {
    let mut reader = Reader::new(data);
    if reader.read_bytes(4)? != PROG_MAGIC {
        return Err(ProgramLoadError::InvalidMagic);
    }
    let version = reader.read_u32()?;
    let mut info = ProgramInfo::default();
    match version {
        1 => load_prog_v1(bus, &mut reader, &mut info)?,
        2 => load_prog_v2(bus, &mut reader, &mut info)?,
        other => return Err(ProgramLoadError::UnsupportedVersion(other)),
    }
    Ok(info)
}

fn load_prog_v1<B: Bus + ?Sized>(
    bus: &mut B,
    reader: &mut Reader<'_>,
    info: &mut ProgramInfo,
) -> Result<(), ProgramLoadError> {
    let name = reader.read_utf8(MAX_PROGRAM_NAME_LENGTH, "program name")?;
    let start = reader.read_u32()? as usize;
    let length = reader.read_u32()? as usize;
    if start + length > MAX_PROGRAM_LENGTH {
        return Err(ProgramLoadError::ProgramTooLarge);
    }
    let flag = reader.read_u32()?;
    let payload = reader.read_bytes(length)?;
    write_block(bus, start as u16, payload);
    if flag == 0 {
        let final_addr = start as i64 + length as i64 - 1;
        let final_addr = finalize_basic(bus, final_addr);
        info.basic_area = true;
        info.add_region(BASIC_START_ADDRESS, final_addr, "");
    } else if length > 0 {
        info.add_region(start as u16, (start + length - 1) as u16, "");
    }
    info.name = name;
    Ok(())
}

fn load_prog_v2<B: Bus + ?Sized>(
    bus: &mut B,
    reader: &mut Reader<'_>,
    info: &mut ProgramInfo,
) -> Result<(), ProgramLoadError> {
    let mut seen_pnam = false;
    let mut seen_pbas = false;
    let mut seen_cmnt = false;
    let mut pbin_count = 0usize;

    loop {
        match reader.remaining() {
            0 => break,
            1..=7 => {
                // Trailing zero padding is tolerated; anything else is a
                // truncated section header.
                let tail = reader.read_bytes(reader.remaining())?;
                if tail.iter().all(|&byte| byte == 0) {
                    break;
                }
                return Err(ProgramLoadError::UnexpectedEof);
            }
            _ => {}
        }
        let section_id = reader.read_u32()?;
        let section_length = reader.read_u32()? as usize;
        let payload = reader.read_bytes(section_length)?;

        match section_id {
            SECTION_PNAM => {
                if seen_pnam {
                    continue;
                }
                seen_pnam = true;
                if payload.len() < 4 {
                    return Err(ProgramLoadError::InvalidSection("PNAM"));
                }
                let name_len = le_u32(payload) as usize;
                if name_len > MAX_PROGRAM_NAME_LENGTH || 4 + name_len > section_length {
                    return Err(ProgramLoadError::InvalidSection("PNAM"));
                }
                info.name = utf8(&payload[4..4 + name_len], "program name")?;
            }
            SECTION_PBAS => {
                if seen_pbas {
                    continue;
                }
                seen_pbas = true;
                if payload.len() < 4 {
                    return Err(ProgramLoadError::InvalidSection("PBAS"));
                }
                let program_length = le_u32(payload) as usize;
                if program_length + 4 != section_length {
                    return Err(ProgramLoadError::InvalidSection("PBAS"));
                }
                if program_length > MAX_PROGRAM_LENGTH {
                    return Err(ProgramLoadError::FieldTooLarge("BASIC program"));
                }
                write_block(bus, BASIC_START_ADDRESS, &payload[4..4 + program_length]);
                let final_addr = BASIC_START_ADDRESS as i64 + program_length as i64 - 1;
                let final_addr = finalize_basic(bus, final_addr);
                info.basic_area = true;
                info.add_region(BASIC_START_ADDRESS, final_addr, "");
            }
            SECTION_PBIN => {
                if pbin_count >= MAX_BINARY_SECTIONS {
                    continue;
                }
                pbin_count += 1;
                if section_length < 8 {
                    return Err(ProgramLoadError::InvalidSection("PBIN"));
                }
                let start = le_u32(&payload[0..4]) as usize;
                let data_length = le_u32(&payload[4..8]) as usize;
                if start + data_length > MAX_PROGRAM_LENGTH {
                    return Err(ProgramLoadError::ProgramTooLarge);
                }
                let data_end = 8 + data_length;
                if data_end > section_length {
                    return Err(ProgramLoadError::InvalidSection("PBIN"));
                }
                let comment = match section_length - data_end {
                    0 => String::new(),
                    1..=3 => return Err(ProgramLoadError::InvalidSection("PBIN")),
                    _ => {
                        let comment_length = le_u32(&payload[data_end..data_end + 4]) as usize;
                        if comment_length > MAX_COMMENT_LENGTH
                            || data_end + 4 + comment_length > section_length
                        {
                            return Err(ProgramLoadError::InvalidSection("PBIN"));
                        }
                        utf8(
                            &payload[data_end + 4..data_end + 4 + comment_length],
                            "PBIN comment",
                        )?
                    }
                };
                write_block(bus, start as u16, &payload[8..data_end]);
                if data_length > 0 {
                    info.add_region(start as u16, (start + data_length - 1) as u16, &comment);
                }
            }
            SECTION_CMNT => {
                if seen_cmnt {
                    continue;
                }
                seen_cmnt = true;
                if payload.len() < 4 {
                    return Err(ProgramLoadError::InvalidSection("CMNT"));
                }
                let comment_length = le_u32(payload) as usize;
                if comment_length > MAX_COMMENT_LENGTH || 4 + comment_length > section_length {
                    return Err(ProgramLoadError::InvalidSection("CMNT"));
                }
                info.comment = utf8(&payload[4..4 + comment_length], "comment")?;
            }
            _ => {} // Unknown IDs are skipped.
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// PROG v2 writer
// ---------------------------------------------------------------------

/// Serialize a PROG v2 container. Enforces the same limits as the reader,
/// so a written file always loads back.
pub fn write_prog_v2(
    name: &str,
    basic: Option<&[u8]>,
    binaries: &[ProgBinary<'_>],
    comment: &str,
) -> Result<Vec<u8>, ProgramLoadError> {
    if name.len() > MAX_PROGRAM_NAME_LENGTH {
        return Err(ProgramLoadError::FieldTooLarge("program name"));
    }
    if comment.len() > MAX_COMMENT_LENGTH {
        return Err(ProgramLoadError::FieldTooLarge("comment"));
    }
    if binaries.len() > MAX_BINARY_SECTIONS {
        return Err(ProgramLoadError::FieldTooLarge("binary sections"));
    }

    let mut out = Vec::new();
    out.extend_from_slice(PROG_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());

    if !name.is_empty() {
        push_section(&mut out, SECTION_PNAM, |body| {
            push_string(body, name);
            Ok(())
        })?;
    }

    if let Some(program) = basic {
        if program.len() > MAX_PROGRAM_LENGTH {
            return Err(ProgramLoadError::FieldTooLarge("BASIC program"));
        }
        push_section(&mut out, SECTION_PBAS, |body| {
            body.extend_from_slice(&(program.len() as u32).to_le_bytes());
            body.extend_from_slice(program);
            Ok(())
        })?;
    }

    for binary in binaries {
        if binary.start as usize + binary.data.len() > MAX_PROGRAM_LENGTH {
            return Err(ProgramLoadError::ProgramTooLarge);
        }
        if binary.comment.len() > MAX_COMMENT_LENGTH {
            return Err(ProgramLoadError::FieldTooLarge("PBIN comment"));
        }
        push_section(&mut out, SECTION_PBIN, |body| {
            body.extend_from_slice(&(binary.start as u32).to_le_bytes());
            body.extend_from_slice(&(binary.data.len() as u32).to_le_bytes());
            body.extend_from_slice(binary.data);
            push_string(body, binary.comment);
            Ok(())
        })?;
    }

    if !comment.is_empty() {
        push_section(&mut out, SECTION_CMNT, |body| {
            push_string(body, comment);
            Ok(())
        })?;
    }

    Ok(out)
}

fn push_section<F>(out: &mut Vec<u8>, id: u32, fill: F) -> Result<(), ProgramLoadError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), ProgramLoadError>,
{
    let mut body = Vec::new();
    fill(&mut body)?;
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(())
}

fn push_string(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

// ---------------------------------------------------------------------
// BASIC text
// ---------------------------------------------------------------------

/// Load BASIC source text. Each non-empty line is a decimal line number
/// followed by content; content is uppercased and `\HH` escapes encode
/// raw bytes.
pub fn load_basic_text<B: Bus + ?Sized>(
    bus: &mut B,
    source: &str,
) -> Result<ProgramInfo, ProgramLoadError> {
    let mut info = ProgramInfo {
        basic_area: true,
        ..ProgramInfo::default()
    };
    let mut addr = BASIC_START_ADDRESS;

    for raw_line in source.lines() {
        let canonical = raw_line.trim().to_uppercase();
        if canonical.is_empty() {
            continue;
        }
        let (line_number, content) = extract_line_number(&canonical, raw_line)?;
        if addr + 2 > BASIC_END_ADDRESS {
            return Err(ProgramLoadError::ProgramTooLarge);
        }
        bus.store16(addr, line_number);
        addr += 2;
        let mut line_length = 2usize;

        for byte in encode_basic_content(content, raw_line)? {
            if addr > BASIC_END_ADDRESS {
                return Err(ProgramLoadError::ProgramTooLarge);
            }
            bus.store8(addr, byte);
            addr += 1;
            line_length += 1;
        }

        if line_length > MAX_BASIC_LINE_LENGTH {
            return Err(ProgramLoadError::LineTooLong(raw_line.trim().to_string()));
        }
        if addr > BASIC_END_ADDRESS {
            return Err(ProgramLoadError::ProgramTooLarge);
        }
        bus.store8(addr, 0x00);
        addr += 1;
    }

    let last_data_address = addr as i64 - 1;
    let final_addr = finalize_basic(bus, last_data_address);
    info.add_region(BASIC_START_ADDRESS, final_addr, "");
    Ok(info)
}

/// Dump the tokenized BASIC area back to text. Non-printable bytes become
/// `\HH` escapes.
pub fn save_basic_text<B: Bus + ?Sized>(bus: &mut B) -> String {
    let end_marker = ((BASIC_TERMINATOR as u16) << 8) | BASIC_TERMINATOR as u16;
    let mut out = String::new();
    let mut addr = BASIC_START_ADDRESS;
    let mut visited = std::collections::HashSet::new();

    loop {
        if !visited.insert(addr) {
            // Broken BASIC area, avoid looping forever.
            break;
        }
        let line_number = bus.load16(addr);
        if line_number == end_marker || line_number == 0x0000 {
            break;
        }
        addr = addr.wrapping_add(2);
        let mut content = String::new();
        loop {
            let value = bus.load8(addr);
            addr = addr.wrapping_add(1);
            if value == 0x00 {
                break;
            }
            if (0x20..=0x7E).contains(&value) {
                content.push(value as char);
            } else {
                content.push_str(&format!("\\{value:02X}"));
            }
        }
        out.push_str(&format!("{line_number} {content}\n"));
    }
    out
}

fn extract_line_number<'a>(
    line: &'a str,
    original: &str,
) -> Result<(u16, &'a str), ProgramLoadError> {
    let digits: usize = line.chars().take_while(|ch| ch.is_ascii_digit()).count();
    if digits == 0 {
        return Err(ProgramLoadError::MissingLineNumber(
            original.trim().to_string(),
        ));
    }
    let number: i64 = line[..digits]
        .parse()
        .map_err(|_| ProgramLoadError::MissingLineNumber(original.trim().to_string()))?;
    if !(1..=32767).contains(&number) {
        return Err(ProgramLoadError::InvalidLineNumber {
            number,
            line: original.trim().to_string(),
        });
    }
    Ok((number as u16, line[digits..].trim_start()))
}

fn encode_basic_content(content: &str, original: &str) -> Result<Vec<u8>, ProgramLoadError> {
    let chars: Vec<char> = content.chars().collect();
    let mut result = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            if i + 2 >= chars.len() {
                return Err(ProgramLoadError::InvalidEscape(original.trim().to_string()));
            }
            let hex: String = chars[i + 1..i + 3].iter().collect();
            let value = u8::from_str_radix(&hex, 16)
                .map_err(|_| ProgramLoadError::InvalidEscape(original.trim().to_string()))?;
            result.push(value);
            i += 3;
        } else {
            result.push((chars[i] as u32 & 0xFF) as u8);
            i += 1;
        }
    }
    Ok(result)
}

// ---------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------

fn write_block<B: Bus + ?Sized>(bus: &mut B, start: u16, data: &[u8]) {
    for (offset, &value) in data.iter().enumerate() {
        bus.store8(start.wrapping_add(offset as u16), value);
    }
}

/// Seal the BASIC area: three 0xDF terminators after the last data byte
/// and four sequential end pointers at 0x0006 (big-endian words).
/// Returns the (clamped) final data address.
fn finalize_basic<B: Bus + ?Sized>(bus: &mut B, final_data_address: i64) -> u16 {
    let final_addr = final_data_address.max(BASIC_START_ADDRESS as i64 - 1) as u16;
    for offset in 1..=3 {
        bus.store8(final_addr.wrapping_add(offset), BASIC_TERMINATOR);
    }
    let mut pointer = final_addr;
    for index in 0..BASIC_POINTER_COUNT {
        bus.store16(BASIC_POINTER_BASE + index * 2, pointer);
        pointer = pointer.wrapping_add(1);
    }
    final_addr
}
