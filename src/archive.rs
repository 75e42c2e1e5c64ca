//! Inspection of downloaded result archives.
//!
//! A result download is a ZIP file holding the output JSON and the original
//! input file. Only the central directory is read; entry data is never
//! decompressed.

use crate::error::{Error, Result};

mod magic {
    /// Local file header "PK\x03\x04"
    pub(super) const LOCAL_HEADER: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
    /// End of central directory "PK\x05\x06"
    pub(super) const END_OF_DIRECTORY: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
    /// Central directory file header "PK\x01\x02"
    pub(super) const DIRECTORY_ENTRY: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];

    pub(super) const END_OF_DIRECTORY_LEN: usize = 22;
    pub(super) const DIRECTORY_ENTRY_LEN: usize = 46;
    pub(super) const MAX_COMMENT_LEN: usize = u16::MAX as usize;
}

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive.
    pub name: String,
    /// Stored (possibly compressed) size in bytes.
    pub compressed_size: u64,
    /// Size after extraction in bytes.
    pub uncompressed_size: u64,
}

/// Whether `data` starts like a ZIP file.
#[must_use]
pub fn is_zip(data: &[u8]) -> bool {
    data.len() >= magic::END_OF_DIRECTORY_LEN
        && (data[..4] == magic::LOCAL_HEADER || data[..4] == magic::END_OF_DIRECTORY)
}

/// List the entries of a ZIP archive held in memory.
pub fn list_entries(data: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let eocd = find_end_of_directory(data)?;
    let entry_count = read_u16(data, eocd + 10)? as usize;
    let directory_size = read_u32(data, eocd + 12)? as usize;
    let directory_offset = read_u32(data, eocd + 16)? as usize;

    if directory_offset
        .checked_add(directory_size)
        .map_or(true, |end| end > eocd)
    {
        return Err(Error::Archive(
            "central directory lies outside the archive".to_string(),
        ));
    }

    let mut entries = Vec::with_capacity(entry_count);
    let mut pos = directory_offset;
    for _ in 0..entry_count {
        if data.get(pos..pos + 4) != Some(&magic::DIRECTORY_ENTRY[..]) {
            return Err(Error::Archive(format!(
                "bad central directory signature at offset {pos}"
            )));
        }
        let compressed_size = u64::from(read_u32(data, pos + 20)?);
        let uncompressed_size = u64::from(read_u32(data, pos + 24)?);
        let name_len = read_u16(data, pos + 28)? as usize;
        let extra_len = read_u16(data, pos + 30)? as usize;
        let comment_len = read_u16(data, pos + 32)? as usize;

        let name_start = pos + magic::DIRECTORY_ENTRY_LEN;
        let name = data
            .get(name_start..name_start + name_len)
            .ok_or_else(|| Error::Archive("truncated entry name".to_string()))?;

        entries.push(ArchiveEntry {
            name: String::from_utf8_lossy(name).into_owned(),
            compressed_size,
            uncompressed_size,
        });
        pos = name_start + name_len + extra_len + comment_len;
    }

    Ok(entries)
}

/// Names of the entries of a ZIP archive held in memory.
pub fn entry_names(data: &[u8]) -> Result<Vec<String>> {
    Ok(list_entries(data)?.into_iter().map(|e| e.name).collect())
}

fn find_end_of_directory(data: &[u8]) -> Result<usize> {
    if data.len() < magic::END_OF_DIRECTORY_LEN {
        return Err(Error::Archive(format!(
            "{} bytes is too short for a ZIP archive",
            data.len()
        )));
    }

    // The record is followed only by its comment, so scan backwards.
    let last = data.len() - magic::END_OF_DIRECTORY_LEN;
    let first = last.saturating_sub(magic::MAX_COMMENT_LEN);
    (first..=last)
        .rev()
        .find(|&i| data[i..i + 4] == magic::END_OF_DIRECTORY)
        .ok_or_else(|| Error::Archive("end of central directory not found".to_string()))
}

fn read_u16(data: &[u8], at: usize) -> Result<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| Error::Archive(format!("truncated at offset {at}")))
}

fn read_u32(data: &[u8], at: usize) -> Result<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::Archive(format!("truncated at offset {at}")))
}
