//! Directory enumeration primitives shared by the directory listing commands.

use bytes::BufMut;
use nom::bytes::complete::take;
use nom::number::complete::{le_i64, le_u32, le_u64};
use nom::sequence::tuple;
use serde::{Deserialize, Serialize};

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_core::logging::{debug, trace};

use crate::protocol::body::FileTime;
use crate::protocol::body::query_directory::InfoLevel;

/// Capacity of one directory record page.
pub const DIRENT_PAGE_SIZE: usize = 4096;
/// ino, offset, name length and type ahead of the name bytes.
pub const DIRENT_HEADER_SIZE: usize = 24;
const DIRENT_ALIGNMENT: usize = 8;

pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DotEntry {
    Dot,
    DotDot,
}

impl DotEntry {
    pub const ALL: [DotEntry; 2] = [DotEntry::Dot, DotEntry::DotDot];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::DotDot => "..",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Dot => 0,
            Self::DotDot => 1,
        }
    }
}

/// Attributes a directory record is encoded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub ino: u64,
    pub attributes: u32,
    pub end_of_file: u64,
    pub allocation_size: u64,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
}

/// Status lookups for the directory being listed.
pub trait DirectoryStat {
    fn self_status(&self) -> SMBResult<FileStatus>;
    fn parent_status(&self) -> SMBResult<FileStatus>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry<'a> {
    pub name: &'a str,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationProgress {
    Complete,
    /// The output buffer ran out; the pending entry is retried on the next pass.
    BufferFull,
}

/// Per-listing state that survives across paged QUERY_DIRECTORY / FIND_NEXT calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEnumerationState {
    dot_emitted: [bool; 2],
    search_pattern: String,
    cursor: u64,
}

impl DirEnumerationState {
    pub fn new<T: Into<String>>(search_pattern: T) -> Self {
        Self {
            dot_emitted: [false; 2],
            search_pattern: search_pattern.into(),
            cursor: 0,
        }
    }

    pub fn search_pattern(&self) -> &str {
        &self.search_pattern
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn advance(&mut self, count: u64) {
        self.cursor += count;
    }

    pub fn is_emitted(&self, entry: DotEntry) -> bool {
        self.dot_emitted[entry.index()]
    }

    /// Restarts the listing, as for SMB2_RESTART_SCANS or a new search pattern.
    pub fn reset(&mut self) {
        self.dot_emitted = [false; 2];
        self.cursor = 0;
    }

    /// Encodes "." and ".." ahead of the real directory entries.
    ///
    /// Entries that were already written, or that the search pattern rejects, are
    /// skipped. When `encode` fails with [`SMBError::BufferFull`] the entry stays
    /// pending and [`EnumerationProgress::BufferFull`] is returned.
    pub fn emit_dot_entries<D, F>(&mut self, info_level: InfoLevel, directory: &D, mut encode: F) -> SMBResult<EnumerationProgress>
    where
        D: DirectoryStat + ?Sized,
        F: FnMut(InfoLevel, &DirEntry<'_>) -> SMBResult<()>,
    {
        for entry in DotEntry::ALL {
            if self.dot_emitted[entry.index()] {
                continue;
            }
            if !pattern_matches(entry.name(), &self.search_pattern) {
                trace!(entry = entry.name(), pattern = %self.search_pattern, "dot entry filtered out");
                self.dot_emitted[entry.index()] = true;
                continue;
            }

            let mut status = match entry {
                DotEntry::Dot => directory.self_status()?,
                DotEntry::DotDot => directory.parent_status()?,
            };
            status.attributes |= FILE_ATTRIBUTE_DIRECTORY;

            match encode(info_level, &DirEntry { name: entry.name(), status }) {
                Ok(()) => self.dot_emitted[entry.index()] = true,
                Err(SMBError::BufferFull(full)) => {
                    debug!(entry = entry.name(), %full, "output buffer full");
                    return Ok(EnumerationProgress::BufferFull);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(EnumerationProgress::Complete)
    }
}

/// DOS wildcard match: `*` spans any run, `?` one character, case-insensitive.
pub fn pattern_matches(name: &str, pattern: &str) -> bool {
    if pattern.is_empty() || pattern == "*" || pattern == "*.*" {
        return true;
    }
    let name = name.chars().flat_map(char::to_lowercase).collect::<Vec<char>>();
    let pattern = pattern.chars().flat_map(char::to_lowercase).collect::<Vec<char>>();

    let (mut n, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            n += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

fn record_length(name_len: usize) -> usize {
    (DIRENT_HEADER_SIZE + name_len).div_ceil(DIRENT_ALIGNMENT) * DIRENT_ALIGNMENT
}

/// Fixed capacity page of 8 byte aligned directory records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecordBuffer {
    data: Vec<u8>,
    capacity: usize,
    entry_count: usize,
    full: bool,
}

impl Default for DirectoryRecordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryRecordBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DIRENT_PAGE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            entry_count: 0,
            full: false,
        }
    }

    /// Appends one record, or fails with [`SMBError::BufferFull`] without writing anything.
    pub fn fill_record(&mut self, name: &[u8], ino: u64, record_type: u32, offset: i64) -> SMBResult<()> {
        let reclen = record_length(name.len());
        if self.data.len() + reclen > self.capacity {
            self.full = true;
            return Err(SMBError::buffer_full(reclen, self.remaining()));
        }

        self.data.put_u64_le(ino);
        self.data.put_i64_le(offset);
        self.data.put_u32_le(name.len() as u32);
        self.data.put_u32_le(record_type);
        self.data.put_slice(name);
        self.data.put_bytes(0, reclen - DIRENT_HEADER_SIZE - name.len());
        self.entry_count += 1;
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.entry_count = 0;
        self.full = false;
    }

    pub fn records(&self) -> DirectoryRecords<'_> {
        DirectoryRecords { remaining: &self.data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord<'a> {
    pub ino: u64,
    pub offset: i64,
    pub record_type: u32,
    pub name: &'a [u8],
}

pub struct DirectoryRecords<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for DirectoryRecords<'a> {
    type Item = DirectoryRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (after_header, (ino, offset, name_len, record_type)) =
            tuple((le_u64::<_, nom::error::Error<&[u8]>>, le_i64, le_u32, le_u32))(self.remaining).ok()?;
        let (_, name) = take::<_, _, nom::error::Error<&[u8]>>(name_len)(after_header).ok()?;
        let reclen = record_length(name_len as usize).min(self.remaining.len());
        self.remaining = &self.remaining[reclen..];
        Some(DirectoryRecord { ino, offset, record_type, name })
    }
}
