use crate::column::ColRef;
use crate::metadata::MdId;

/// One partitioned table scan consuming partition selection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartInfoEntry {
    pub scan_id: u32,
    pub table: MdId,
    pub part_keys: Vec<Vec<ColRef>>,
}

/// Dynamic scans below an expression, keyed by scan id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartInfo {
    entries: Vec<PartInfoEntry>,
}

impl PartInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scan. A scan id is only recorded once.
    pub fn add(&mut self, scan_id: u32, table: MdId, part_keys: Vec<Vec<ColRef>>) {
        if !self.contains(scan_id) {
            self.entries.push(PartInfoEntry {
                scan_id,
                table,
                part_keys,
            });
        }
    }

    pub fn contains(&self, scan_id: u32) -> bool {
        self.entries.iter().any(|e| e.scan_id == scan_id)
    }

    pub fn entry(&self, scan_id: u32) -> Option<&PartInfoEntry> {
        self.entries.iter().find(|e| e.scan_id == scan_id)
    }

    pub fn entries(&self) -> &[PartInfoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn combine(&self, other: &PartInfo) -> PartInfo {
        let mut result = self.clone();
        for entry in &other.entries {
            result.add(entry.scan_id, entry.table, entry.part_keys.clone());
        }
        result
    }
}
