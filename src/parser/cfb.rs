//! Compound-file container reader.
//!
//! Legacy Word documents are stored in a sector-addressed container: a
//! 512-byte header, a sector allocation table (FAT) chained together by the
//! header's DIFAT, a directory of named entries and, for small streams, a
//! mini stream with its own allocation table. This module reads the
//! container straight from an in-memory byte slice and never reads past its
//! end: a chain that runs off the file surfaces as [`Error::Truncated`].

use std::collections::HashSet;

use crate::detect::COMPOUND_FILE_MAGIC;
use crate::error::{Error, Result};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

const HEADER_SIZE: usize = 512;
const DIRENTRY_SIZE: usize = 128;
const HEADER_DIFAT_ENTRIES: usize = 109;

/// Maximum regular sector number.
const MAXREGSECT: u32 = 0xFFFF_FFFA;
/// End of a sector chain.
const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
/// Unallocated sector.
const FREESECT: u32 = 0xFFFF_FFFF;
/// Empty sibling/child pointer in the directory tree.
const NOSTREAM: u32 = 0xFFFF_FFFF;

/// Raw container header (512 bytes).
#[allow(dead_code)]
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Raw directory entry (128 bytes).
#[allow(dead_code)]
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE, null-terminated
    name: [u8; 64],
    /// Length of name in bytes, including the terminator
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Unused slot
    Empty,
    /// A storage (directory-like container)
    Storage,
    /// A stream of bytes
    Stream,
    /// The root storage, which also owns the mini stream
    Root,
    /// Reserved or unknown type code
    Other(u8),
}

impl From<u8> for EntryType {
    fn from(code: u8) -> Self {
        match code {
            0 => EntryType::Empty,
            1 => EntryType::Storage,
            2 => EntryType::Stream,
            5 => EntryType::Root,
            other => EntryType::Other(other),
        }
    }
}

/// A decoded directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Index of this entry in the directory
    pub sid: u32,
    /// Entry name
    pub name: String,
    /// Entry type
    pub entry_type: EntryType,
    /// First sector of the entry's data
    pub start_sector: u32,
    /// Declared size in bytes
    pub size: u64,
    left: u32,
    right: u32,
    child: u32,
}

impl DirectoryEntry {
    /// Check if this entry is a stream.
    pub fn is_stream(&self) -> bool {
        self.entry_type == EntryType::Stream
    }
}

/// An opened compound-file container.
#[derive(Debug)]
pub struct CompoundFile<'a> {
    data: &'a [u8],
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<DirectoryEntry>,
    // Directory slot -> index into `entries`
    slots: Vec<Option<usize>>,
}

impl<'a> CompoundFile<'a> {
    /// Open a container from its raw bytes.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        if !data.starts_with(COMPOUND_FILE_MAGIC) {
            return Err(Error::NotACompoundFile("missing signature".to_string()));
        }
        if data.len() < HEADER_SIZE {
            return Err(Error::Truncated(format!(
                "header needs {} bytes, file has {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        let header = RawHeader::read_from_bytes(&data[..HEADER_SIZE])
            .map_err(|_| Error::NotACompoundFile("unreadable header".to_string()))?;

        if header.byte_order.get() != 0xFFFE {
            return Err(Error::NotACompoundFile("invalid byte order mark".to_string()));
        }

        let sector_shift = header.sector_shift.get();
        let sector_size = match (header.major_version.get(), sector_shift) {
            (3, 9) => 512,
            (4, 12) => 4096,
            (version, shift) => {
                return Err(Error::NotACompoundFile(format!(
                    "version {} with sector shift {} is not supported",
                    version, shift
                )))
            }
        };

        let mini_sector_shift = header.mini_sector_shift.get();
        if mini_sector_shift == 0 || mini_sector_shift >= sector_shift {
            return Err(Error::NotACompoundFile(format!(
                "invalid mini sector shift {}",
                mini_sector_shift
            )));
        }

        let mut cfb = CompoundFile {
            data,
            sector_size,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff: header.mini_stream_cutoff.get(),
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            slots: Vec::new(),
        };

        cfb.load_fat(&header)?;
        cfb.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0 {
            cfb.load_minifat(header.first_minifat_sector.get())?;
        }

        Ok(cfb)
    }

    /// Sector size in bytes (512 or 4096).
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// Number of sectors physically present after the header.
    pub fn sector_count(&self) -> usize {
        (self.data.len().saturating_sub(self.sector_size) + self.sector_size - 1) / self.sector_size
    }

    /// All non-empty directory entries, in directory order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Find a stream directly under the root storage by name.
    ///
    /// Names compare case-insensitively, as the container format prescribes.
    pub fn find_stream(&self, name: &str) -> Option<&DirectoryEntry> {
        let matches = |e: &&DirectoryEntry| e.is_stream() && e.name.eq_ignore_ascii_case(name);

        match self.root_children() {
            Some(children) => children.into_iter().find(matches),
            None => {
                log::warn!("Directory tree is damaged, scanning all entries for {:?}", name);
                self.entries.iter().find(matches)
            }
        }
    }

    /// Read the full contents of a stream entry.
    pub fn read_stream(&self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        let size = usize::try_from(entry.size).unwrap_or(usize::MAX);
        if size == 0 {
            return Ok(Vec::new());
        }
        if size > self.data.len() {
            return Err(Error::Truncated(format!(
                "stream {:?} declares {} bytes, file has {}",
                entry.name,
                size,
                self.data.len()
            )));
        }

        if entry.is_stream() && entry.size < u64::from(self.mini_stream_cutoff) {
            self.read_mini_stream(entry, size)
        } else {
            read_chain(entry.start_sector, size, &self.fat, self.sector_size, |sector| {
                self.sector(sector)
            })
        }
    }

    fn read_mini_stream(&self, entry: &DirectoryEntry, size: usize) -> Result<Vec<u8>> {
        let root = self
            .entries
            .iter()
            .find(|e| e.entry_type == EntryType::Root)
            .ok_or_else(|| Error::NotACompoundFile("missing root entry".to_string()))?;

        let ministream_size = usize::try_from(root.size).unwrap_or(usize::MAX);
        if ministream_size > self.data.len() {
            return Err(Error::Truncated(format!(
                "mini stream declares {} bytes, file has {}",
                ministream_size,
                self.data.len()
            )));
        }
        let ministream = read_chain(
            root.start_sector,
            ministream_size,
            &self.fat,
            self.sector_size,
            |sector| self.sector(sector),
        )?;

        let unit = self.mini_sector_size;
        let ministream = &ministream;
        read_chain(entry.start_sector, size, &self.minifat, unit, move |sector| {
            let start = sector as usize * unit;
            if start >= ministream.len() {
                return Err(Error::Truncated(format!(
                    "mini sector {} lies beyond the mini stream",
                    sector
                )));
            }
            let end = (start + unit).min(ministream.len());
            Ok(&ministream[start..end])
        })
    }

    /// Get the bytes of a regular sector; the final sector may be short.
    fn sector(&self, sector: u32) -> Result<&'a [u8]> {
        if sector > MAXREGSECT {
            return Err(Error::NotACompoundFile(format!(
                "invalid sector number {:#x}",
                sector
            )));
        }
        let start = (sector as usize + 1) * self.sector_size;
        if start >= self.data.len() {
            return Err(Error::Truncated(format!(
                "sector {} lies beyond end of file",
                sector
            )));
        }
        let end = (start + self.sector_size).min(self.data.len());
        Ok(&self.data[start..end])
    }

    /// Build the FAT from the header DIFAT entries and any DIFAT sectors.
    fn load_fat(&mut self, header: &RawHeader) -> Result<()> {
        let num_fat_sectors = header.num_fat_sectors.get() as usize;
        let sector_count = self.sector_count();
        if num_fat_sectors > sector_count {
            return Err(Error::Truncated(format!(
                "header declares {} FAT sectors, file has {} sectors",
                num_fat_sectors, sector_count
            )));
        }

        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|s| s.get())
            .take_while(|&s| s <= MAXREGSECT)
            .take(num_fat_sectors)
            .collect();

        let entries_per_difat = self.sector_size / 4 - 1;
        let mut difat_sector = header.first_difat_sector.get();
        let mut remaining = header.num_difat_sectors.get();
        let mut visited = HashSet::new();

        while fat_sectors.len() < num_fat_sectors && remaining > 0 && difat_sector <= MAXREGSECT {
            if !visited.insert(difat_sector) {
                return Err(Error::NotACompoundFile("DIFAT chain loops".to_string()));
            }
            log::trace!("Reading DIFAT sector {}", difat_sector);
            let data = self.full_sector(difat_sector)?;
            let ids: Vec<u32> = u32_table(data).collect();
            fat_sectors.extend(
                ids[..entries_per_difat]
                    .iter()
                    .copied()
                    .take_while(|&s| s <= MAXREGSECT),
            );
            difat_sector = ids[entries_per_difat];
            remaining -= 1;
        }
        fat_sectors.truncate(num_fat_sectors);

        if fat_sectors.len() < num_fat_sectors {
            log::warn!(
                "Header declares {} FAT sectors, found {}",
                num_fat_sectors,
                fat_sectors.len()
            );
        }

        self.fat.reserve(fat_sectors.len() * self.sector_size / 4);
        for sector in fat_sectors {
            let data = self.full_sector(sector)?;
            self.fat.extend(u32_table(data));
        }

        Ok(())
    }

    fn load_minifat(&mut self, first_sector: u32) -> Result<()> {
        let data = read_whole_chain(first_sector, &self.fat, |s| self.full_sector(s))?;
        self.minifat = u32_table(&data).collect();
        Ok(())
    }

    fn load_directory(&mut self, first_sector: u32) -> Result<()> {
        let data = read_whole_chain(first_sector, &self.fat, |s| self.full_sector(s))?;
        let version_3 = self.sector_size == 512;
        self.slots = vec![None; data.len() / DIRENTRY_SIZE];

        for (sid, raw) in data.chunks_exact(DIRENTRY_SIZE).enumerate() {
            let raw = RawDirectoryEntry::read_from_bytes(raw)
                .map_err(|_| Error::NotACompoundFile("unreadable directory entry".to_string()))?;
            let entry_type = EntryType::from(raw.entry_type);
            if entry_type == EntryType::Empty {
                continue;
            }

            // Version 3 files may leave garbage in the high half of the size.
            let size = if version_3 {
                raw.stream_size.get() & 0xFFFF_FFFF
            } else {
                raw.stream_size.get()
            };

            self.slots[sid] = Some(self.entries.len());
            self.entries.push(DirectoryEntry {
                sid: sid as u32,
                name: decode_entry_name(&raw.name, raw.name_len.get() as usize),
                entry_type,
                start_sector: raw.start_sector.get(),
                size,
                left: raw.sid_left.get(),
                right: raw.sid_right.get(),
                child: raw.sid_child.get(),
            });
        }

        if self.entries.is_empty() {
            return Err(Error::NotACompoundFile("empty directory".to_string()));
        }
        Ok(())
    }

    /// Collect the direct children of the root storage by walking its sibling tree.
    ///
    /// Returns `None` if the tree references missing entries or loops.
    fn root_children(&self) -> Option<Vec<&DirectoryEntry>> {
        let by_sid = |sid: u32| {
            let index = self.slots.get(sid as usize).copied().flatten()?;
            self.entries.get(index)
        };
        let root = self.entries.iter().find(|e| e.entry_type == EntryType::Root)?;

        let mut children = Vec::new();
        let mut stack = vec![root.child];
        let mut visited = 0usize;

        while let Some(sid) = stack.pop() {
            if sid == NOSTREAM {
                continue;
            }
            visited += 1;
            if visited > self.entries.len() {
                return None;
            }
            let entry = by_sid(sid)?;
            children.push(entry);
            stack.push(entry.left);
            stack.push(entry.right);
        }

        Some(children)
    }

    /// Get a sector that must be complete (FAT, DIFAT, directory).
    fn full_sector(&self, sector: u32) -> Result<&'a [u8]> {
        let data = self.sector(sector)?;
        if data.len() < self.sector_size {
            return Err(Error::Truncated(format!("sector {} is incomplete", sector)));
        }
        Ok(data)
    }
}

/// Follow an allocation chain, concatenating units until `size` bytes are collected.
fn read_chain<'s, F>(start: u32, size: usize, table: &[u32], unit: usize, mut fetch: F) -> Result<Vec<u8>>
where
    F: FnMut(u32) -> Result<&'s [u8]>,
{
    let mut out = Vec::with_capacity(size);
    let mut sector = start;
    let mut steps = 0usize;

    while out.len() < size {
        if sector > MAXREGSECT {
            return Err(Error::Truncated(format!(
                "chain ended after {} of {} bytes",
                out.len(),
                size
            )));
        }
        steps += 1;
        if steps > table.len() {
            return Err(Error::NotACompoundFile("sector chain loops".to_string()));
        }

        log::trace!("Reading chain sector {}", sector);
        let data = fetch(sector)?;
        let take = data.len().min(size - out.len());
        out.extend_from_slice(&data[..take]);

        if data.len() < unit && out.len() < size {
            return Err(Error::Truncated(format!(
                "sector {} is incomplete after {} of {} bytes",
                sector,
                out.len(),
                size
            )));
        }

        sector = table.get(sector as usize).copied().unwrap_or(FREESECT);
    }

    Ok(out)
}

/// Follow an allocation chain to its end (for structures without a declared size).
fn read_whole_chain<'s, F>(start: u32, table: &[u32], mut fetch: F) -> Result<Vec<u8>>
where
    F: FnMut(u32) -> Result<&'s [u8]>,
{
    let mut out = Vec::new();
    let mut sector = start;
    let mut steps = 0usize;

    while sector != ENDOFCHAIN {
        if sector > MAXREGSECT {
            return Err(Error::NotACompoundFile(format!(
                "unexpected chain marker {:#x}",
                sector
            )));
        }
        steps += 1;
        if steps > table.len() {
            return Err(Error::NotACompoundFile("sector chain loops".to_string()));
        }
        out.extend_from_slice(fetch(sector)?);
        sector = table.get(sector as usize).copied().unwrap_or(ENDOFCHAIN);
    }

    Ok(out)
}

/// Interpret bytes as a little-endian u32 table.
fn u32_table(data: &[u8]) -> impl Iterator<Item = u32> + '_ {
    data.chunks_exact(4).map(|chunk| {
        U32::<LE>::read_from_bytes(chunk)
            .map(|v| v.get())
            .unwrap_or(FREESECT)
    })
}

/// Decode a UTF-16LE entry name of `name_len` bytes including its terminator.
fn decode_entry_name(raw: &[u8; 64], name_len: usize) -> String {
    let byte_len = if name_len >= 2 && name_len <= raw.len() && name_len % 2 == 0 {
        name_len - 2
    } else {
        log::warn!("Directory entry has invalid name length {}", name_len);
        raw.chunks_exact(2)
            .position(|c| c == [0, 0])
            .map_or(raw.len(), |i| i * 2)
    };

    let units: Vec<u16> = raw[..byte_len]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
