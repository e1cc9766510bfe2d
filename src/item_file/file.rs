//! Content reconstruction (Component H, file half; spec.md §4.9, §4.4): a
//! backward walk over a file item's revisions that drives the delta
//! engine to recover each revision's bytes from the latest content, and
//! delegates to a branch parent once the walk crosses the branch point.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::delta;
use crate::error::{Error, Result};
use crate::fullname::PhysicalName;
use crate::item_file::ItemFile;
use crate::record::revision::RevisionPayload;
use crate::record::{Record, RecordClass};

/// Resolves a physical name to the bytes of its item file and (when
/// needed) its current data file, so [`FileItem`] can open a branch
/// parent without depending on [`crate::database::Database`] directly
/// (which in turn depends on this module).
pub trait FileItemSource {
    fn open_file_item(&self, physical_name: PhysicalName) -> Result<Rc<FileItem>>;
}

pub struct FileItem {
    pub item: ItemFile,
    /// The lowest revision number this file's own record stream covers;
    /// set by [`FileItem::build_revisions`]. Versions below this number
    /// belong to the branch parent.
    branch_point: RefCell<Option<i32>>,
    /// Memoized reconstructed content, keyed by revision number, filled
    /// in lazily by [`FileItem::build_revisions`].
    content_cache: RefCell<HashMap<i32, Rc<Vec<u8>>>>,
}

impl FileItem {
    pub fn new(item: ItemFile) -> FileItem {
        FileItem {
            item,
            branch_point: RefCell::new(None),
            content_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn physical_name(&self) -> PhysicalName {
        self.item.physical_name
    }

    pub fn locked(&self) -> bool {
        self.item.header.flags.locked()
    }
    pub fn binary(&self) -> bool {
        self.item.header.flags.binary()
    }
    pub fn latest_only(&self) -> bool {
        self.item.header.flags.latest_only()
    }
    pub fn shared(&self) -> bool {
        self.item.header.flags.shared()
    }
    pub fn checked_out(&self) -> bool {
        self.item.header.flags.checked_out()
    }

    pub fn latest_revision(&self) -> i32 {
        self.item.header.latest_revision
    }

    pub fn has_branch_parent(&self) -> bool {
        self.item.header.has_branch_parent()
    }

    /// Walks this file's revisions from last to first, applying each
    /// checkin's delta record against the content accumulated so far
    /// (starting from `latest_bytes`, the current data file's contents)
    /// and memoizing the result against its revision number. Non-checkin
    /// revisions pass content through unchanged. Returns the branch
    /// point (the first revision number handled by this file, if lower
    /// revisions belong to a branch parent).
    pub fn build_revisions(&self, latest_bytes: &[u8]) -> Result<Option<i32>> {
        let revisions = self.item.revisions()?;
        let mut content = Rc::new(latest_bytes.to_vec());
        let mut cache = self.content_cache.borrow_mut();
        let mut lowest_rev = self.item.header.latest_revision;

        for (_, record) in revisions.iter().rev() {
            let rev = record
                .as_revision()
                .expect("revisions() filtered to Record::Revision");
            cache.insert(rev.rev_num, Rc::clone(&content));
            lowest_rev = rev.rev_num;
            if let crate::record::revision::RevisionVariant::Checkin {
                prev_delta_offset, ..
            } = &rev.variant
            {
                if *prev_delta_offset != 0 {
                    let delta_record = self
                        .item
                        .records
                        .get_record(*prev_delta_offset as usize, Some(RecordClass::Delta))?;
                    let delta_payload = delta_record
                        .as_delta()
                        .expect("checked RecordClass::Delta");
                    let prior = delta::apply(delta_payload, &content)?;
                    content = Rc::new(prior);
                }
            }
        }
        let branch_point = if self.has_branch_parent() {
            Some(lowest_rev)
        } else {
            None
        };
        *self.branch_point.borrow_mut() = branch_point;
        Ok(branch_point)
    }

    /// The reconstructed content of `version`, delegating to the branch
    /// parent (spec.md §4.9, §8 S4) when `version` predates this file's
    /// earliest revision and a branch parent exists.
    pub fn revision<S: FileItemSource>(
        &self,
        version: i32,
        source: &S,
    ) -> Result<Rc<Vec<u8>>> {
        if let Some(branch_point) = *self.branch_point.borrow() {
            if version < branch_point && self.has_branch_parent() {
                let parent = source.open_file_item(self.item.header.branch_parent)?;
                return parent.revision(version, source);
            }
        }
        if let Some(content) = self.content_cache.borrow().get(&version) {
            return Ok(Rc::clone(content));
        }
        if self.has_branch_parent() {
            let parent = source.open_file_item(self.item.header.branch_parent)?;
            return parent.revision(version, source);
        }
        Err(Error::ArgumentOutOfRange {
            version,
            min: 1,
            max: self.item.header.latest_revision,
        })
    }

    /// Every revision record in file order, for callers building
    /// [`crate::action::Action`]s directly.
    pub fn revisions(&self) -> Result<Vec<(usize, Rc<Record>)>> {
        self.item.revisions()
    }

    pub fn project_backlinks(&self) -> Result<Vec<PhysicalName>> {
        self.item.project_backlinks()
    }

    pub fn resolve_comment(&self, rev: &RevisionPayload) -> Result<Option<String>> {
        self.item.resolve_comment(rev.comment_offset)
    }

    pub fn resolve_label_comment(&self, rev: &RevisionPayload) -> Result<Option<String>> {
        self.item.resolve_comment(rev.label_comment_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::record::revision::ActionKind;

    fn revision_bytes(action: ActionKind, prev_delta_offset: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0u32.to_le_bytes()); // prev_rev_offset
        b.extend_from_slice(&action.code().to_le_bytes());
        b.extend_from_slice(&1i32.to_le_bytes()); // rev_num
        b.extend_from_slice(&0u32.to_le_bytes()); // timestamp
        b.extend_from_slice(&[0u8; 32]); // user
        b.extend_from_slice(&[0u8; 32]); // label
        b.extend_from_slice(&0u32.to_le_bytes()); // comment_offset
        b.extend_from_slice(&0u32.to_le_bytes()); // label_comment_offset
        b.extend_from_slice(&0u32.to_le_bytes()); // comment_length
        b.extend_from_slice(&0u32.to_le_bytes()); // label_comment_length
        // Checkin tail: prev_delta_offset, flags, project_path[260]
        b.extend_from_slice(&prev_delta_offset.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&[0u8; 260]);
        b
    }

    fn wrap_record(signature: [u8; 2], payload: &[u8]) -> Vec<u8> {
        let mut rec = Vec::new();
        rec.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        rec.push(signature[1]);
        rec.push(signature[0]);
        let crc = crate::crc::crc16(payload);
        rec.extend_from_slice(&crc.to_le_bytes());
        rec.extend_from_slice(payload);
        rec
    }

    fn item_header_bytes(latest_revision: i32) -> Vec<u8> {
        item_header_bytes_with_branch(latest_revision, &[0u8; 8])
    }

    fn item_header_bytes_with_branch(latest_revision: i32, branch_parent: &[u8; 8]) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&0u16.to_le_bytes()); // flags
        h.extend_from_slice(&latest_revision.to_le_bytes());
        h.push(b'A'); // data_ext
        h.push(0); // reserved
        h.extend_from_slice(&36u32.to_le_bytes()); // first_revision_offset
        h.extend_from_slice(&36u32.to_le_bytes()); // last_revision_offset
        h.extend_from_slice(branch_parent);
        h.extend_from_slice(&0u32.to_le_bytes()); // first_project_offset
        h.extend_from_slice(&0u32.to_le_bytes()); // child_count
        h.extend_from_slice(&0u32.to_le_bytes()); // first_log_offset
        h
    }

    fn identity_delta_record(content_len: u32) -> Vec<u8> {
        let mut delta_payload = Vec::new();
        delta_payload.extend_from_slice(&1u16.to_le_bytes()); // WriteSuccessor
        delta_payload.extend_from_slice(&content_len.to_le_bytes());
        delta_payload.extend_from_slice(&0u32.to_le_bytes());
        delta_payload.extend_from_slice(&2u16.to_le_bytes()); // Stop
        delta_payload.extend_from_slice(&0u32.to_le_bytes());
        delta_payload.extend_from_slice(&0u32.to_le_bytes());
        wrap_record(*b"FD", &delta_payload)
    }

    fn single_revision_file(
        physical_name: &str,
        latest_revision: i32,
        rev_num: i32,
        branch_parent: &[u8; 8],
        latest_bytes: &[u8],
    ) -> FileItem {
        let delta_record = identity_delta_record(latest_bytes.len() as u32);
        let mut bytes = item_header_bytes_with_branch(latest_revision, branch_parent);
        let header_len = bytes.len();
        let delta_offset = header_len as u32;
        bytes.extend_from_slice(&delta_record);
        let mut revision_payload = revision_bytes(ActionKind::CheckinFile, delta_offset);
        // rev_num sits right after prev_rev_offset (4 bytes) + action code (2 bytes).
        revision_payload[6..10].copy_from_slice(&rev_num.to_le_bytes());
        bytes.extend_from_slice(&wrap_record(*b"EL", &revision_payload));

        let item = ItemFile::open(
            PhysicalName::from_str(physical_name).unwrap(),
            Rc::from(bytes.into_boxed_slice()),
            ParseOptions::default(),
            encoding_rs::WINDOWS_1252,
        )
        .unwrap();
        let file = FileItem::new(item);
        file.build_revisions(latest_bytes).unwrap();
        file
    }

    struct SingleParentSource {
        parent_physical_name: PhysicalName,
        parent: Rc<FileItem>,
    }

    impl FileItemSource for SingleParentSource {
        fn open_file_item(&self, physical_name: PhysicalName) -> Result<Rc<FileItem>> {
            if physical_name == self.parent_physical_name {
                Ok(Rc::clone(&self.parent))
            } else {
                Err(Error::VssFileNotFound(std::path::PathBuf::from(
                    physical_name.to_string(),
                )))
            }
        }
    }

    #[test]
    fn revision_before_branch_point_delegates_to_parent_s4() {
        let parent_physical_name = PhysicalName::from_str("PPPPPPPP").unwrap();
        let parent = Rc::new(single_revision_file(
            "PPPPPPPP",
            1,
            1,
            &[0u8; 8],
            b"parent content",
        ));
        let child = single_revision_file(
            "CCCCCCCC",
            2,
            2,
            &parent_physical_name.0,
            b"child content",
        );

        let source = SingleParentSource {
            parent_physical_name,
            parent: Rc::clone(&parent),
        };

        let resolved = child.revision(1, &source).unwrap();
        assert_eq!(resolved.as_slice(), b"parent content");
    }

    #[test]
    fn single_checkin_identity_delta_round_trips() {
        // Delta record: WriteSuccessor(11, 0) | Stop -- identity.
        let mut delta_payload = Vec::new();
        delta_payload.extend_from_slice(&1u16.to_le_bytes());
        delta_payload.extend_from_slice(&11u32.to_le_bytes());
        delta_payload.extend_from_slice(&0u32.to_le_bytes());
        delta_payload.extend_from_slice(&2u16.to_le_bytes());
        delta_payload.extend_from_slice(&0u32.to_le_bytes());
        delta_payload.extend_from_slice(&0u32.to_le_bytes());
        let delta_record = wrap_record(*b"FD", &delta_payload);

        let mut bytes = item_header_bytes(1);
        let header_len = bytes.len();
        let delta_offset = header_len as u32;
        bytes.extend_from_slice(&delta_record);
        let revision_offset = bytes.len();
        let revision_payload = revision_bytes(ActionKind::CheckinFile, delta_offset);
        bytes.extend_from_slice(&wrap_record(*b"EL", &revision_payload));
        let _ = (delta_offset, revision_offset);

        let item = ItemFile::open(
            PhysicalName::from_str("AAAAAAAA").unwrap(),
            Rc::from(bytes.into_boxed_slice()),
            ParseOptions::default(),
            encoding_rs::WINDOWS_1252,
        )
        .unwrap();
        let file = FileItem::new(item);
        let branch_point = file.build_revisions(b"hello world").unwrap();
        assert_eq!(branch_point, None);
        let content = file.content_cache.borrow().get(&1).cloned().unwrap();
        assert_eq!(content.as_slice(), b"hello world");
    }
}
