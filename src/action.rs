//! Revision & Action objects (Component I; spec.md §4.10): projects each
//! raw revision record into a typed, action-specific logical revision and
//! then into an exportable [`Action`] carrying the fields a migration
//! pipeline needs, plus a stable one-line description.
//!
//! Reconstruction-level errors (dangling offsets, missing branch
//! parents) never abort the walk: per spec.md §7 they are captured as
//! non-fatal strings on the owning `Action`.

use crate::database::Database;
use crate::fullname::PhysicalName;
use crate::item_file::file::FileItem;
use crate::item_file::ItemFile;
use crate::record::revision::{ActionKind, RevisionPayload, RevisionVariant};

/// The action-specific payload an [`Action`] carries, beyond the common
/// `{timestamp, user, base_path, name, comment, version}` fields.
#[derive(Debug, Clone)]
pub enum ActionExtra {
    Label,
    Create,
    Add,
    Delete,
    Recover,
    Destroy,
    Rename { old_name: String },
    MoveFrom { destination: String },
    MoveTo { source: String },
    Share { pinned_version: Option<i32> },
    Pin { pinned_version: Option<i32> },
    Unpin,
    Branch { branch_file: PhysicalName },
    Checkin,
    Archive,
    Restore,
    /// A reconstruction-level failure that prevented descending into a
    /// child item (e.g. a pruned branch parent, §8 S6-adjacent); the
    /// containing `Action`'s `errors` also carries the same message.
    Error(String),
}

/// One exportable, migration-ready projection of a revision record.
#[derive(Debug, Clone)]
pub struct Action {
    pub timestamp: u32,
    pub user: String,
    /// The project path context the revision was logged under, when the
    /// variant carries one (checkout/move/share/branch/checkin
    /// revisions); empty string otherwise.
    pub base_path: String,
    pub name: String,
    pub physical_name: PhysicalName,
    pub comment: Option<String>,
    pub label: Option<String>,
    pub version: i32,
    pub extra: ActionExtra,
    /// Non-fatal errors encountered while resolving this action's
    /// comment, label, or display name (spec.md §7).
    pub errors: Vec<String>,
}

impl Action {
    /// A stable, human-readable one-line description, independent of
    /// `Display`/`Debug` so downstream consumers (and [`crate::dump`])
    /// can rely on its exact shape.
    pub fn description(&self) -> String {
        match &self.extra {
            ActionExtra::Label => format!("labeled \"{}\"", self.name),
            ActionExtra::Create => format!("created {}", self.name),
            ActionExtra::Add => format!("added {}", self.name),
            ActionExtra::Delete => format!("deleted {}", self.name),
            ActionExtra::Recover => format!("recovered {}", self.name),
            ActionExtra::Destroy => format!("destroyed {}", self.name),
            ActionExtra::Rename { old_name } => format!("renamed {old_name} to {}", self.name),
            ActionExtra::MoveFrom { destination } => format!("moved {} to {destination}", self.name),
            ActionExtra::MoveTo { source } => format!("moved {} from {source}", self.name),
            ActionExtra::Share {
                pinned_version: Some(v),
            } => format!("shared {} pinned at version {v}", self.name),
            ActionExtra::Share { pinned_version: None } => format!("shared {}", self.name),
            ActionExtra::Pin {
                pinned_version: Some(v),
            } => format!("pinned {} at version {v}", self.name),
            ActionExtra::Pin { pinned_version: None } => format!("pinned {}", self.name),
            ActionExtra::Unpin => format!("unpinned {}", self.name),
            ActionExtra::Branch { branch_file } => {
                format!("branched {} from {branch_file}", self.name)
            }
            ActionExtra::Checkin => format!("checked in {} (version {})", self.name, self.version),
            ActionExtra::Archive => format!("archived {}", self.name),
            ActionExtra::Restore => format!("restored {}", self.name),
            ActionExtra::Error(message) => format!("error resolving {}: {message}", self.name),
        }
    }
}

/// A synthetic `Action` standing in for a child item the walker could not
/// open (spec.md §7: reconstruction errors are captured, not fatal).
pub fn error_action(
    physical_name: PhysicalName,
    display_name: String,
    base_path: String,
    message: String,
) -> Action {
    Action {
        timestamp: 0,
        user: String::new(),
        base_path,
        name: display_name,
        physical_name,
        comment: None,
        label: None,
        version: 0,
        extra: ActionExtra::Error(message.clone()),
        errors: vec![message],
    }
}

/// Resolves `name`'s display string through the database's name file,
/// falling back to the raw short name (and recording an error string)
/// if resolution fails.
fn display_name(db: &Database, name: &crate::fullname::VssName, errors: &mut Vec<String>) -> String {
    match db.long_name(name) {
        Ok(text) => text,
        Err(e) => {
            errors.push(format!("failed to resolve display name: {e}"));
            name.short_name_string(db.encoding())
                .unwrap_or_else(|_| String::from("<unresolvable>"))
        }
    }
}

fn resolve_comment_for(item: &ItemFile, rev: &RevisionPayload, errors: &mut Vec<String>) -> Option<String> {
    match item.resolve_comment(rev.comment_offset) {
        Ok(comment) => comment,
        Err(e) => {
            errors.push(format!("failed to resolve comment: {e}"));
            None
        }
    }
}

fn resolve_label_for(item: &ItemFile, rev: &RevisionPayload, errors: &mut Vec<String>) -> Option<String> {
    if rev.label.trim_end_matches('\0').is_empty() {
        return None;
    }
    match item.resolve_comment(rev.label_comment_offset) {
        Ok(Some(text)) => Some(text),
        Ok(None) => Some(rev.label.clone()),
        Err(e) => {
            errors.push(format!("failed to resolve label comment: {e}"));
            Some(rev.label.clone())
        }
    }
}

/// Builds the `Action` for one revision in a project's own record stream.
pub fn from_project_revision(db: &Database, item: &ItemFile, rev: &RevisionPayload) -> Action {
    let mut errors = Vec::new();
    let comment = resolve_comment_for(item, rev, &mut errors);
    let label = resolve_label_for(item, rev, &mut errors);

    let (base_path, name, physical_name, extra) = match &rev.variant {
        RevisionVariant::Label => (
            String::new(),
            rev.label.clone(),
            item.physical_name,
            ActionExtra::Label,
        ),
        RevisionVariant::Common { name, physical_name } => {
            let display = display_name(db, name, &mut errors);
            let kind = match rev.action {
                ActionKind::CreateProject | ActionKind::CreateFile => ActionExtra::Create,
                ActionKind::AddProject | ActionKind::AddFile => ActionExtra::Add,
                ActionKind::DeleteProject | ActionKind::DeleteFile => ActionExtra::Delete,
                ActionKind::RecoverProject | ActionKind::RecoverFile => ActionExtra::Recover,
                _ => ActionExtra::Add,
            };
            (String::new(), display, *physical_name, kind)
        }
        RevisionVariant::Destroy { name, physical_name } => {
            let display = display_name(db, name, &mut errors);
            (String::new(), display, *physical_name, ActionExtra::Destroy)
        }
        RevisionVariant::Rename {
            new_name,
            old_name,
            physical_name,
        } => {
            let new_display = display_name(db, new_name, &mut errors);
            let old_display = display_name(db, old_name, &mut errors);
            (
                String::new(),
                new_display,
                *physical_name,
                ActionExtra::Rename { old_name: old_display },
            )
        }
        RevisionVariant::Move {
            path,
            name,
            physical_name,
        } => {
            let display = display_name(db, name, &mut errors);
            let extra = match rev.action {
                ActionKind::MoveFrom => ActionExtra::MoveFrom {
                    destination: path.clone(),
                },
                _ => ActionExtra::MoveTo { source: path.clone() },
            };
            (path.clone(), display, *physical_name, extra)
        }
        RevisionVariant::Share(share) => {
            let display = display_name(db, &share.name, &mut errors);
            let extra = match rev.action {
                ActionKind::PinFile => ActionExtra::Pin {
                    pinned_version: share.pinned_version,
                },
                ActionKind::UnpinFile => ActionExtra::Unpin,
                _ => ActionExtra::Share {
                    pinned_version: share.pinned_version,
                },
            };
            (share.project_path.clone(), display, share.physical_name, extra)
        }
        RevisionVariant::Branch {
            share,
            branch_file_physical_name,
        } => {
            let display = display_name(db, &share.name, &mut errors);
            (
                share.project_path.clone(),
                display,
                share.physical_name,
                ActionExtra::Branch {
                    branch_file: *branch_file_physical_name,
                },
            )
        }
        RevisionVariant::Checkin { project_path, .. } => (
            project_path.clone(),
            String::new(),
            item.physical_name,
            ActionExtra::Checkin,
        ),
        RevisionVariant::ArchiveRestore {
            archive_file_name,
            parent_physical_name,
        } => {
            let extra = match rev.action {
                ActionKind::ArchiveProject | ActionKind::ArchiveFile => ActionExtra::Archive,
                _ => ActionExtra::Restore,
            };
            (
                archive_file_name.clone(),
                String::new(),
                *parent_physical_name,
                extra,
            )
        }
    };

    Action {
        timestamp: rev.timestamp,
        user: rev.user.clone(),
        base_path,
        name,
        physical_name,
        comment,
        label,
        version: rev.rev_num,
        extra,
        errors,
    }
}

/// Builds the `Action` for one revision in a file's own record stream.
pub fn from_file_revision(db: &Database, file: &FileItem, rev: &RevisionPayload) -> Action {
    from_project_revision(db, &file.item, rev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_formats_create() {
        let action = Action {
            timestamp: 0,
            user: "bob".into(),
            base_path: String::new(),
            name: "foo.txt".into(),
            physical_name: PhysicalName::from_str("AAAAAAAA").unwrap(),
            comment: None,
            label: None,
            version: 1,
            extra: ActionExtra::Create,
            errors: Vec::new(),
        };
        assert_eq!(action.description(), "created foo.txt");
    }

    #[test]
    fn description_formats_rename() {
        let action = Action {
            timestamp: 0,
            user: "bob".into(),
            base_path: String::new(),
            name: "new.txt".into(),
            physical_name: PhysicalName::from_str("AAAAAAAA").unwrap(),
            comment: None,
            label: None,
            version: 2,
            extra: ActionExtra::Rename {
                old_name: "old.txt".into(),
            },
            errors: Vec::new(),
        };
        assert_eq!(action.description(), "renamed old.txt to new.txt");
    }
}
