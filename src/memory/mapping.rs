// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRange, MemoryRegion, Protection};
use std::fs;
use std::path::Path;

/// Lowest address ever handed out for a trampoline page.
const MIN_GAP_ADDRESS: u64 = 0x10000;

/// Snapshot of a process address space as reported by `/proc/<pid>/maps`.
pub struct MemoryMapping {
    regions: Vec<MemoryRegion>,
}

impl MemoryMapping {
    pub fn current() -> Result<Self, MemoryError> {
        Self::load("/proc/self/maps")
    }

    pub fn for_pid(pid: i32) -> Result<Self, MemoryError> {
        Self::load(format!("/proc/{}/maps", pid))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, MemoryError> {
        let mut regions = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            regions.push(parse_line(line)?);
        }
        regions.sort_by_key(|r| r.start());
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn find_region(&self, addr: Address) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    pub fn overlapping(&self, range: &MemoryRange) -> Vec<&MemoryRegion> {
        self.regions
            .iter()
            .filter(|r| r.range().intersection(range).is_some())
            .collect()
    }

    /// True when every byte of `range` is mapped and satisfies `predicate`.
    /// An empty range covers nothing.
    pub fn covers<F>(&self, range: &MemoryRange, predicate: F) -> bool
    where
        F: Fn(Protection) -> bool,
    {
        if range.is_empty() {
            return false;
        }
        let mut cursor = range.start();
        for region in self.overlapping(range) {
            if region.start() > cursor || !predicate(region.protection()) {
                return false;
            }
            cursor = region.end();
            if cursor >= range.end() {
                return true;
            }
        }
        cursor >= range.end()
    }

    /// Unmapped holes between regions, in ascending order.
    pub fn free_gaps(&self) -> Vec<MemoryRange> {
        let mut gaps = Vec::new();
        let mut cursor = Address::new(MIN_GAP_ADDRESS);
        for region in &self.regions {
            if region.start() > cursor {
                if let Ok(gap) = MemoryRange::new(cursor, region.start()) {
                    gaps.push(gap);
                }
            }
            cursor = cursor.max(region.end());
        }
        gaps
    }

    /// Start of the mapping of `path` at file offset zero.
    pub fn image_base(&self, path: &str) -> Option<Address> {
        self.regions
            .iter()
            .filter(|r| r.offset() == 0 && r.file_path() == Some(path))
            .map(|r| r.start())
            .min()
    }
}

fn parse_line(line: &str) -> Result<MemoryRegion, MemoryError> {
    let malformed = || MemoryError::MalformedMap(line.to_string());
    let mut fields = line.split_whitespace();

    let bounds = fields.next().ok_or_else(malformed)?;
    let perms = fields.next().ok_or_else(malformed)?;
    let offset = fields.next().ok_or_else(malformed)?;
    let _device = fields.next().ok_or_else(malformed)?;
    let _inode = fields.next().ok_or_else(malformed)?;
    let path = fields.collect::<Vec<_>>().join(" ");

    let (start, end) = bounds.split_once('-').ok_or_else(malformed)?;
    let start = u64::from_str_radix(start, 16).map_err(|_| malformed())?;
    let end = u64::from_str_radix(end, 16).map_err(|_| malformed())?;
    let offset = u64::from_str_radix(offset, 16).map_err(|_| malformed())?;

    let range = MemoryRange::new(Address::new(start), Address::new(end)).map_err(|_| malformed())?;
    let mut region = MemoryRegion::new(range, Protection::from_maps_perms(perms))
        .with_offset(offset)
        .with_shared(perms.ends_with('s'));
    if !path.is_empty() {
        region = region.with_file_path(path);
    }
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
555555554000-555555556000 r--p 00000000 08:02 1234   /usr/bin/demo
555555556000-55555555a000 r-xp 00002000 08:02 1234   /usr/bin/demo
55555555a000-55555555c000 rw-p 00006000 08:02 1234   /usr/bin/demo
7ffff7dd0000-7ffff7dd2000 rw-p 00000000 00:00 0
7ffffffde000-7ffffffff000 rw-p 00000000 00:00 0      [stack]
";

    #[test]
    fn test_parse_sample() {
        let map = MemoryMapping::parse(SAMPLE).unwrap();
        assert_eq!(map.regions().len(), 5);
        let text = map.find_region(Address::new(0x555555557000)).unwrap();
        assert_eq!(text.protection(), Protection::ReadExecute);
        assert_eq!(text.offset(), 0x2000);
        assert_eq!(text.file_path(), Some("/usr/bin/demo"));
        assert!(map.find_region(Address::new(0x1000)).is_none());
    }

    #[test]
    fn test_image_base() {
        let map = MemoryMapping::parse(SAMPLE).unwrap();
        assert_eq!(map.image_base("/usr/bin/demo"), Some(Address::new(0x555555554000)));
        assert_eq!(map.image_base("/usr/bin/other"), None);
    }

    #[test]
    fn test_covers() {
        let map = MemoryMapping::parse(SAMPLE).unwrap();
        let across = MemoryRange::new(Address::new(0x555555555ff0), Address::new(0x555555556010)).unwrap();
        assert!(map.covers(&across, |p| p.can_read()));
        assert!(!map.covers(&across, |p| p.can_execute()));

        let hole = MemoryRange::new(Address::new(0x55555555bff0), Address::new(0x55555555c010)).unwrap();
        assert!(!map.covers(&hole, |_| true));

        let inside = Address::new(0x555555557000);
        assert!(!map.covers(&MemoryRange::new(inside, inside).unwrap(), |_| true));
        let unmapped = Address::new(0xFFFF_FFFF_FFFF_F000);
        assert!(!map.covers(&MemoryRange::new(unmapped, unmapped).unwrap(), |_| true));
    }

    #[test]
    fn test_free_gaps() {
        let map = MemoryMapping::parse(SAMPLE).unwrap();
        let gaps = map.free_gaps();
        assert_eq!(gaps[0].start(), Address::new(MIN_GAP_ADDRESS));
        assert_eq!(gaps[0].end(), Address::new(0x555555554000));
        assert_eq!(gaps[1].start(), Address::new(0x55555555c000));
        assert_eq!(gaps[1].end(), Address::new(0x7ffff7dd0000));
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            MemoryMapping::parse("zzzz-1000 r-xp 0 0 0"),
            Err(MemoryError::MalformedMap(_))
        ));
    }

    #[test]
    fn test_current_process_has_stack() {
        let map = MemoryMapping::current().unwrap();
        let local = 0u64;
        let region = map.find_region(Address::from_ptr(&local as *const u64)).unwrap();
        assert!(region.protection().can_write());
    }
}
