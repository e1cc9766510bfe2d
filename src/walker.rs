//! The tree walker (Component J): recursively visits a project's own
//! revision log and its children, follows a branched file's history back
//! through its parent file, and merges everything into one chronological
//! `Action` stream.

use std::collections::HashMap;

use crate::action::{self, Action};
use crate::database::Database;
use crate::error::Result;
use crate::fullname::PhysicalName;
use crate::item_file::file::FileItem;
use crate::item_file::project::ProjectItem;
use crate::record::revision::{ActionKind, RevisionPayload, RevisionVariant};

/// Whether a child physical name names a project or a file, inferred
/// from the `ActionKind` of the revision that most recently touched it
/// within the owning project's own log.
///
/// The record layer has no explicit "this physical name is a project"
/// marker independent of the action that created it (spec.md's
/// `Common`/`Destroy`/`Rename` variants are shared between the project
/// and file flavors of those actions, distinguished only by the action
/// code); this crate infers the kind from the most specific action seen
/// and, failing that, falls back to trying to open the physical name as
/// a project first and a file second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildKind {
    Project,
    File,
}

fn infer_child_kind(action: ActionKind) -> Option<ChildKind> {
    use ActionKind::*;
    match action {
        CreateProject | AddProject | DeleteProject | RecoverProject | DestroyProject
        | RenameProject | ArchiveProject | RestoreProject => Some(ChildKind::Project),
        CreateFile | AddFile | DeleteFile | RecoverFile | DestroyFile | RenameFile
        | ShareFile | PinFile | UnpinFile | CreateBranch | CheckinFile | ArchiveFile
        | RestoreFile => Some(ChildKind::File),
        Label | MoveFrom | MoveTo => None,
    }
}

fn physical_name_of(rev: &RevisionPayload) -> Option<PhysicalName> {
    match &rev.variant {
        RevisionVariant::Common { physical_name, .. }
        | RevisionVariant::Destroy { physical_name, .. }
        | RevisionVariant::Rename { physical_name, .. }
        | RevisionVariant::Move { physical_name, .. } => Some(*physical_name),
        RevisionVariant::Share(share) => Some(share.physical_name),
        RevisionVariant::Branch { share, .. } => Some(share.physical_name),
        RevisionVariant::Label | RevisionVariant::Checkin { .. } | RevisionVariant::ArchiveRestore { .. } => None,
    }
}

/// Reconstructs the full chronological action history of a single file,
/// following `WriteSuccessor`'s companion link — the branch-parent
/// reference — back through as many generations as the file was
/// branched (spec.md §4.9, §8 S4).
pub fn file_actions(db: &Database, file: &FileItem) -> Result<Vec<Action>> {
    let mut actions: Vec<Action> = file
        .revisions()?
        .iter()
        .map(|(_, record)| {
            let rev = record
                .as_revision()
                .expect("revisions() filtered to Record::Revision");
            action::from_file_revision(db, file, rev)
        })
        .collect();

    if file.has_branch_parent() {
        match db.open_file(file.item.header.branch_parent) {
            Ok(parent) => {
                let mut parent_actions = file_actions(db, &parent)?;
                actions.append(&mut parent_actions);
            }
            Err(e) => actions.push(action::error_action(
                file.item.header.branch_parent,
                file.item.header.branch_parent.to_string(),
                String::new(),
                format!("branch parent unavailable: {e}"),
            )),
        }
    }

    actions.sort_by_key(|a| a.timestamp);
    Ok(actions)
}

/// Recursively walks `project`'s own revision log and, when `recursive`,
/// every child the project's directory state resolves to at its final
/// fold step, merging the whole subtree into one chronologically sorted
/// stream.
pub fn walk_project(db: &Database, project: &ProjectItem, recursive: bool) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    let mut known_kinds: HashMap<PhysicalName, ChildKind> = HashMap::new();

    for (_, record) in project.item.revisions()? {
        let rev = record
            .as_revision()
            .expect("revisions() filtered to Record::Revision");
        if let (Some(kind), Some(physical_name)) = (infer_child_kind(rev.action), physical_name_of(rev)) {
            known_kinds.insert(physical_name, kind);
        }
        actions.push(action::from_project_revision(db, &project.item, rev));
    }

    if recursive {
        let steps = project.fold_directory_states(db.names())?;
        if let Some(last) = steps.last() {
            for child in last.state_after.entries() {
                let descended = match known_kinds.get(&child.physical_name).copied() {
                    Some(ChildKind::Project) => descend_as_project(db, child.physical_name),
                    Some(ChildKind::File) => descend_as_file(db, child.physical_name),
                    None => descend_as_project(db, child.physical_name)
                        .or_else(|_| descend_as_file(db, child.physical_name)),
                };
                match descended {
                    Ok(mut child_actions) => actions.append(&mut child_actions),
                    Err(e) => actions.push(action::error_action(
                        child.physical_name,
                        child.long_name.clone(),
                        String::new(),
                        format!("could not open child: {e}"),
                    )),
                }
            }
        }
    }

    actions.sort_by_key(|a| a.timestamp);
    Ok(actions)
}

fn descend_as_project(db: &Database, physical_name: PhysicalName) -> Result<Vec<Action>> {
    let project = db.open_project(physical_name)?;
    walk_project(db, &project, true)
}

fn descend_as_file(db: &Database, physical_name: PhysicalName) -> Result<Vec<Action>> {
    let file = db.open_file(physical_name)?;
    file_actions(db, &file)
}

/// Opens the root project (default physical name `AAAAAAAA`, spec.md
/// §4.7) and walks it, per `recursive`.
pub fn walk_root(db: &Database, recursive: bool) -> Result<Vec<Action>> {
    let root = db.open_root_project()?;
    walk_project(db, &root, recursive)
}
