//! Directory-state reconstruction (Component H, project half; spec.md
//! §4.8): a forward fold over a project item's revisions that maintains
//! a sorted array of the project's children at every point in time.

use crate::error::Result;
use crate::fullname::{indexing_name, FullName, PhysicalName};
use crate::item_file::ItemFile;
use crate::name_file::NameFile;
use crate::record::revision::{ActionKind, RevisionPayload, RevisionVariant};

/// The sorted array `S` of a project's children at one point in its
/// history. Sort key is `(indexing_name bytewise, physical_name
/// tie-breaker)` (spec.md §3 "Directory state"); `physical_name` is
/// unique among the entries present at any one time (invariant 6).
#[derive(Debug, Clone, Default)]
pub struct DirectoryState(Vec<FullName>);

impl DirectoryState {
    pub fn new() -> DirectoryState {
        DirectoryState(Vec::new())
    }

    pub fn entries(&self) -> &[FullName] {
        &self.0
    }

    fn key(indexing_name: &[u8], physical_name: &PhysicalName) -> (&[u8], &PhysicalName) {
        (indexing_name, physical_name)
    }

    /// Insertion point for `(indexing_name, physical_name)`, permitting
    /// an idempotent `insert` (spec.md §4.8 "returns the insertion point
    /// on miss").
    pub fn find_insertion_index(&self, indexing_name: &[u8], physical_name: &PhysicalName) -> usize {
        let target = Self::key(indexing_name, physical_name);
        self.0
            .partition_point(|f| Self::key(&f.indexing_name, &f.physical_name) < target)
    }

    /// Binary search on `indexing_name`; ties are broken by
    /// `physical_name` when given, else the first match is returned.
    /// `None` on miss (spec.md §4.8's `-1`).
    pub fn find_item_index(
        &self,
        indexing_name: &[u8],
        physical_name: Option<&PhysicalName>,
    ) -> Option<usize> {
        let start = self.0.partition_point(|f| f.indexing_name.as_slice() < indexing_name);
        let end = self.0.partition_point(|f| f.indexing_name.as_slice() <= indexing_name);
        if start == end {
            return None;
        }
        match physical_name {
            Some(pn) => self.0[start..end]
                .iter()
                .position(|f| &f.physical_name == pn)
                .map(|i| start + i),
            None => Some(start),
        }
    }

    pub fn insert(&mut self, full_name: FullName) -> usize {
        let idx = self.find_insertion_index(&full_name.indexing_name, &full_name.physical_name);
        self.0.insert(idx, full_name);
        idx
    }

    pub fn remove_by_index(&mut self, idx: usize) -> FullName {
        self.0.remove(idx)
    }
}

/// One revision applied to the directory state, plus the index its
/// subject occupied immediately after the fold step — so a later action
/// referencing the same revision (or a caller inspecting history) can
/// locate it without searching again.
#[derive(Debug, Clone)]
pub struct FoldStep {
    pub revision_offset: usize,
    pub action: ActionKind,
    /// `None` when the revision didn't resolve to a live entry (e.g. a
    /// `Delete`/`Destroy` that just removed one, or a lookup-only action
    /// whose subject was already absent).
    pub index: Option<usize>,
    pub state_after: DirectoryState,
}

pub struct ProjectItem {
    pub item: ItemFile,
}

impl ProjectItem {
    pub fn new(item: ItemFile) -> ProjectItem {
        ProjectItem { item }
    }

    pub fn physical_name(&self) -> PhysicalName {
        self.item.physical_name
    }

    /// Forward-folds every revision in file order, applying spec.md
    /// §4.8's action table, and returns the state after each step.
    pub fn fold_directory_states(&self, names: &NameFile) -> Result<Vec<FoldStep>> {
        let mut state = DirectoryState::new();
        let mut steps = Vec::with_capacity(self.item.header.latest_revision.max(0) as usize);
        for (offset, record) in self.item.revisions()? {
            let rev = record
                .as_revision()
                .expect("revisions() filtered to Record::Revision");
            let index = apply_revision(&mut state, rev, names, self.item.encoding)?;
            steps.push(FoldStep {
                revision_offset: offset,
                action: rev.action,
                index,
                state_after: state.clone(),
            });
        }
        Ok(steps)
    }
}

/// Applies one revision to `state` per spec.md §4.8's action table and
/// returns the index of the entry the revision concerned, if any.
///
/// `Delete` is folded the same as `Destroy` (both remove the live
/// entry) and `Recover` the same as `Create`/`Add` (both (re)insert):
/// spec.md's own §8 scenario S2 requires `find_item(B) == -1` right
/// after a `Delete`, which only holds if deletion removes the entry
/// from `S` rather than merely flagging it — the data model carries no
/// separate "deleted" bit to flag with, so removal is the only
/// structure `FullName`/`DirectoryState` can represent.
fn apply_revision(
    state: &mut DirectoryState,
    rev: &RevisionPayload,
    names: &NameFile,
    encoding: &'static encoding_rs::Encoding,
) -> Result<Option<usize>> {
    use ActionKind::*;
    match &rev.variant {
        RevisionVariant::Common { name, physical_name } => match rev.action {
            CreateProject | AddProject | CreateFile | AddFile | RecoverProject | RecoverFile => {
                let full_name = full_name_of(name, *physical_name, names, encoding)?;
                Ok(Some(state.insert(full_name)))
            }
            DeleteProject | DeleteFile => {
                remove_matching(state, name, *physical_name, names, encoding)
            }
            _ => Ok(None),
        },
        RevisionVariant::Destroy { name, physical_name } => {
            remove_matching(state, name, *physical_name, names, encoding)
        }
        RevisionVariant::Rename {
            new_name,
            old_name,
            physical_name,
        } => {
            let old_indexing = indexing_name(&names.get_long_name(old_name, encoding)?, encoding);
            if let Some(idx) = state.find_item_index(&old_indexing, Some(physical_name)) {
                state.remove_by_index(idx);
            }
            let full_name = full_name_of(new_name, *physical_name, names, encoding)?;
            Ok(Some(state.insert(full_name)))
        }
        RevisionVariant::Move { name, physical_name, .. } => match rev.action {
            MoveFrom => remove_matching(state, name, *physical_name, names, encoding),
            MoveTo => {
                let full_name = full_name_of(name, *physical_name, names, encoding)?;
                Ok(Some(state.insert(full_name)))
            }
            _ => Ok(None),
        },
        RevisionVariant::Share(share) => {
            let indexing = indexing_name(&names.get_long_name(&share.name, encoding)?, encoding);
            Ok(state.find_item_index(&indexing, Some(&share.physical_name)))
        }
        RevisionVariant::Branch { share, .. } => {
            let indexing = indexing_name(&names.get_long_name(&share.name, encoding)?, encoding);
            Ok(state.find_item_index(&indexing, Some(&share.physical_name)))
        }
        RevisionVariant::Label | RevisionVariant::Checkin { .. } | RevisionVariant::ArchiveRestore { .. } => {
            Ok(None)
        }
    }
}

fn full_name_of(
    name: &crate::fullname::VssName,
    physical_name: PhysicalName,
    names: &NameFile,
    encoding: &'static encoding_rs::Encoding,
) -> Result<FullName> {
    let logical_name = names.get_long_name(name, encoding)?;
    Ok(FullName::new(logical_name, physical_name, encoding))
}

fn remove_matching(
    state: &mut DirectoryState,
    name: &crate::fullname::VssName,
    physical_name: PhysicalName,
    names: &NameFile,
    encoding: &'static encoding_rs::Encoding,
) -> Result<Option<usize>> {
    let indexing = indexing_name(&names.get_long_name(name, encoding)?, encoding);
    match state.find_item_index(&indexing, Some(&physical_name)) {
        Some(idx) => {
            state.remove_by_index(idx);
            Ok(Some(idx))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fn_at(logical: &str, physical: &str) -> FullName {
        FullName::new(
            logical.to_string(),
            PhysicalName::from_str(physical).unwrap(),
            encoding_rs::WINDOWS_1252,
        )
    }

    #[test]
    fn insert_keeps_sorted_order() {
        let mut state = DirectoryState::new();
        state.insert(fn_at("banana", "BBBBBBBB"));
        state.insert(fn_at("apple", "AAAAAAAA"));
        state.insert(fn_at("cherry", "CCCCCCCC"));
        let names: Vec<_> = state.entries().iter().map(|f| f.logical_name.as_str()).collect();
        assert_eq!(names, vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn delete_then_recover_round_trips_s2() {
        let mut state = DirectoryState::new();
        state.insert(fn_at("a", "AAAAAAAA"));
        let b = fn_at("b", "BBBBBBBB");
        let b_idx = state.insert(b.clone());
        state.insert(fn_at("c", "CCCCCCCC"));

        let idx = state.find_item_index(&b.indexing_name, Some(&b.physical_name)).unwrap();
        assert_eq!(idx, b_idx);
        state.remove_by_index(idx);
        assert_eq!(state.find_item_index(&b.indexing_name, Some(&b.physical_name)), None);

        state.insert(b.clone());
        assert!(state.find_item_index(&b.indexing_name, Some(&b.physical_name)).is_some());
        let names: Vec<_> = state.entries().iter().map(|f| f.logical_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn rename_across_sort_boundary_s3() {
        let mut state = DirectoryState::new();
        let apple = fn_at("apple", "AAAAAAAA");
        state.insert(apple.clone());
        state.insert(fn_at("banana", "BBBBBBBB"));

        let idx = state
            .find_item_index(&apple.indexing_name, Some(&apple.physical_name))
            .unwrap();
        state.remove_by_index(idx);
        state.insert(fn_at("zebra", "AAAAAAAA"));

        let names: Vec<_> = state.entries().iter().map(|f| f.logical_name.as_str()).collect();
        assert_eq!(names, vec!["banana", "zebra"]);
        assert_eq!(state.entries()[1].physical_name, PhysicalName::from_str("AAAAAAAA").unwrap());
    }
}
