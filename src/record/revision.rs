//! Revision (log entry) records: the common base layout shared by every
//! action, plus the action-specific tail selected by the `action` code.

use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::fullname::{PhysicalName, VssName, SIZEOF_PHYSICAL_NAME};
use crate::options::ParseOptions;
use crate::record::payload::SIZEOF_PROJECT_PATH;

pub const SIZEOF_USERNAME: usize = 32;
pub const SIZEOF_LABEL: usize = 32;

/// Which action a revision record describes.
///
/// This crate pins a concrete numeric mapping for these codes, since
/// spec text alone underdetermines them and different VSS variants are
/// documented to disagree; this mapping is internal to this crate's own
/// fixtures and is not claimed to match any particular on-disk VSS
/// release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Label,
    CreateProject,
    AddProject,
    CreateFile,
    AddFile,
    DeleteProject,
    DeleteFile,
    RecoverProject,
    RecoverFile,
    DestroyProject,
    DestroyFile,
    RenameProject,
    RenameFile,
    MoveFrom,
    MoveTo,
    ShareFile,
    PinFile,
    UnpinFile,
    CreateBranch,
    CheckinFile,
    ArchiveProject,
    ArchiveFile,
    RestoreProject,
    RestoreFile,
}

impl ActionKind {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<ActionKind> {
        use ActionKind::*;
        Some(match code {
            0 => Label,
            1 => CreateProject,
            2 => AddProject,
            3 => CreateFile,
            4 => AddFile,
            5 => DeleteProject,
            6 => DeleteFile,
            7 => RecoverProject,
            8 => RecoverFile,
            9 => DestroyProject,
            10 => DestroyFile,
            11 => RenameProject,
            12 => RenameFile,
            13 => MoveFrom,
            14 => MoveTo,
            15 => ShareFile,
            16 => PinFile,
            17 => UnpinFile,
            18 => CreateBranch,
            19 => CheckinFile,
            20 => ArchiveProject,
            21 => ArchiveFile,
            22 => RestoreProject,
            23 => RestoreFile,
            _ => return None,
        })
    }

    pub fn touches_project(self) -> bool {
        use ActionKind::*;
        matches!(
            self,
            CreateProject
                | DeleteProject
                | RecoverProject
                | DestroyProject
                | RenameProject
                | ArchiveProject
                | RestoreProject
        )
    }
}

/// Fields shared by `ShareFile`, `PinFile`, `UnpinFile`, and the share
/// half of `CreateBranch`.
#[derive(Debug, Clone)]
pub struct ShareFields {
    pub project_path: String,
    pub name: VssName,
    pub physical_name: PhysicalName,
    pub flags: u16,
    /// `None` unless this revision pins the file to a specific version.
    pub pinned_version: Option<i32>,
}

/// The action-specific tail of a revision record.
#[derive(Debug, Clone)]
pub enum RevisionVariant {
    Label,
    /// Create/Add/Delete/Recover (common shape; the specific meaning is
    /// carried by the owning record's `ActionKind`).
    Common {
        name: VssName,
        physical_name: PhysicalName,
    },
    Destroy {
        name: VssName,
        physical_name: PhysicalName,
    },
    Rename {
        new_name: VssName,
        old_name: VssName,
        physical_name: PhysicalName,
    },
    Move {
        path: String,
        name: VssName,
        physical_name: PhysicalName,
    },
    Share(ShareFields),
    Branch {
        share: ShareFields,
        branch_file_physical_name: PhysicalName,
    },
    Checkin {
        prev_delta_offset: u32,
        flags: u16,
        project_path: String,
    },
    ArchiveRestore {
        archive_file_name: String,
        parent_physical_name: PhysicalName,
    },
}

#[derive(Debug, Clone)]
pub struct RevisionPayload {
    pub prev_rev_offset: u32,
    pub action: ActionKind,
    pub rev_num: i32,
    pub timestamp: u32,
    pub user: String,
    pub label: String,
    pub comment_offset: u32,
    pub label_comment_offset: u32,
    pub comment_length: u32,
    pub label_comment_length: u32,
    pub variant: RevisionVariant,
}

fn read_physical_name(reader: &mut ByteReader) -> Result<PhysicalName> {
    let bytes = reader.read_bytes(SIZEOF_PHYSICAL_NAME)?;
    PhysicalName::from_bytes(&bytes)
}

fn read_share_fields(reader: &mut ByteReader) -> Result<ShareFields> {
    let project_path = reader.read_string(SIZEOF_PROJECT_PATH)?;
    let name = VssName::parse(reader)?;
    let physical_name = read_physical_name(reader)?;
    let flags = reader.read_uint16(true)?;
    let raw_pin = reader.read_int32(true)?;
    let pinned_version = if raw_pin < 0 { None } else { Some(raw_pin) };
    Ok(ShareFields {
        project_path,
        name,
        physical_name,
        flags,
        pinned_version,
    })
}

fn parse_variant(action: ActionKind, reader: &mut ByteReader) -> Result<RevisionVariant> {
    use ActionKind::*;
    Ok(match action {
        Label => RevisionVariant::Label,
        CreateProject | AddProject | CreateFile | AddFile | DeleteProject | DeleteFile
        | RecoverProject | RecoverFile => {
            let name = VssName::parse(reader)?;
            let physical_name = read_physical_name(reader)?;
            RevisionVariant::Common {
                name,
                physical_name,
            }
        }
        DestroyProject | DestroyFile => {
            let name = VssName::parse(reader)?;
            let physical_name = read_physical_name(reader)?;
            RevisionVariant::Destroy {
                name,
                physical_name,
            }
        }
        RenameProject | RenameFile => {
            let new_name = VssName::parse(reader)?;
            let old_name = VssName::parse(reader)?;
            let physical_name = read_physical_name(reader)?;
            RevisionVariant::Rename {
                new_name,
                old_name,
                physical_name,
            }
        }
        MoveFrom | MoveTo => {
            let path = reader.read_string(SIZEOF_PROJECT_PATH)?;
            let name = VssName::parse(reader)?;
            let physical_name = read_physical_name(reader)?;
            RevisionVariant::Move {
                path,
                name,
                physical_name,
            }
        }
        ShareFile | PinFile | UnpinFile => RevisionVariant::Share(read_share_fields(reader)?),
        CreateBranch => {
            let share = read_share_fields(reader)?;
            let branch_file_physical_name = read_physical_name(reader)?;
            RevisionVariant::Branch {
                share,
                branch_file_physical_name,
            }
        }
        CheckinFile => {
            let prev_delta_offset = reader.read_uint32(true)?;
            let flags = reader.read_uint16(true)?;
            let project_path = reader.read_string(SIZEOF_PROJECT_PATH)?;
            RevisionVariant::Checkin {
                prev_delta_offset,
                flags,
                project_path,
            }
        }
        ArchiveProject | ArchiveFile | RestoreProject | RestoreFile => {
            let archive_file_name = reader.read_string(SIZEOF_PROJECT_PATH)?;
            let parent_physical_name = read_physical_name(reader)?;
            RevisionVariant::ArchiveRestore {
                archive_file_name,
                parent_physical_name,
            }
        }
    })
}

impl RevisionPayload {
    pub fn parse(reader: &mut ByteReader, offset: usize, options: &ParseOptions) -> Result<Option<RevisionPayload>> {
        let prev_rev_offset = reader.read_uint32(true)?;
        let action_code = reader.read_uint16(true)?;
        let rev_num = reader.read_int32(true)?;
        let timestamp = reader.read_uint32(true)?;
        let user = reader.read_string(SIZEOF_USERNAME)?;
        let label = reader.read_string(SIZEOF_LABEL)?;
        let comment_offset = reader.read_uint32(true)?;
        let label_comment_offset = reader.read_uint32(true)?;
        let comment_length = reader.read_uint32(true)?;
        let label_comment_length = reader.read_uint32(true)?;

        let action = match ActionKind::from_code(action_code) {
            Some(a) => a,
            None => {
                if options.ignore_unknown_actions {
                    log::warn!("unknown revision action code {action_code} at offset {offset:#x}, skipping");
                    return Ok(None);
                }
                return Err(Error::UnknownRevisionAction {
                    offset,
                    action: action_code,
                });
            }
        };
        let variant = parse_variant(action, reader)?;

        Ok(Some(RevisionPayload {
            prev_rev_offset,
            action,
            rev_num,
            timestamp,
            user,
            label,
            comment_offset,
            label_comment_offset,
            comment_length,
            label_comment_length,
            variant,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn base_bytes(action: u16) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0u32.to_le_bytes()); // prev_rev_offset
        b.extend_from_slice(&action.to_le_bytes());
        b.extend_from_slice(&1i32.to_le_bytes()); // rev_num
        b.extend_from_slice(&0u32.to_le_bytes()); // timestamp
        b.extend_from_slice(&[0u8; SIZEOF_USERNAME]); // user
        b.extend_from_slice(&[0u8; SIZEOF_LABEL]); // label
        b.extend_from_slice(&0u32.to_le_bytes()); // comment_offset
        b.extend_from_slice(&0u32.to_le_bytes()); // label_comment_offset
        b.extend_from_slice(&0u32.to_le_bytes()); // comment_length
        b.extend_from_slice(&0u32.to_le_bytes()); // label_comment_length
        b
    }

    #[test]
    fn label_revision_has_no_tail() {
        let bytes = base_bytes(ActionKind::Label.code());
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        let rev = RevisionPayload::parse(&mut r, 0, &ParseOptions::default())
            .unwrap()
            .unwrap();
        assert!(matches!(rev.variant, RevisionVariant::Label));
    }

    #[test]
    fn unknown_action_is_strict_error_by_default() {
        let bytes = base_bytes(9999);
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        assert!(matches!(
            RevisionPayload::parse(&mut r, 0, &ParseOptions::default()),
            Err(Error::UnknownRevisionAction { .. })
        ));
    }

    #[test]
    fn unknown_action_is_skipped_when_lenient() {
        let bytes = base_bytes(9999);
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        let result = RevisionPayload::parse(&mut r, 0, &ParseOptions::permissive()).unwrap();
        assert!(result.is_none());
    }
}
