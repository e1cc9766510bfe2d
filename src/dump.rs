//! The human-readable dumper (spec.md §6 "Output"): renders one section
//! per record or action to an abstract text sink, with verbosity tiers
//! controlling how much raw/offset detail is included.

use std::io::{self, Write};

use crate::action::Action;
use crate::record::header::RecordHeader;
use crate::record::Record;

/// How much detail the dumper emits per record/action (spec.md §6
/// "verbosity flags select whether raw header bytes, CRC values, and
/// per-field offsets are emitted").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DumpVerbosity {
    /// One line per record/action: signature or description only.
    Summary,
    /// Summary plus decoded field values.
    Fields,
    /// Fields plus raw header bytes, CRC values, and absolute offsets.
    Raw,
}

impl DumpVerbosity {
    /// Maps a repeated `-v` count to a tier: 0 = `Summary`, 1 =
    /// `Fields`, 2+ = `Raw`.
    pub fn from_count(count: u8) -> DumpVerbosity {
        match count {
            0 => DumpVerbosity::Summary,
            1 => DumpVerbosity::Fields,
            _ => DumpVerbosity::Raw,
        }
    }
}

/// Writes one record's section to `sink`.
pub fn dump_record(
    sink: &mut dyn Write,
    header: &RecordHeader,
    record: &Record,
    verbosity: DumpVerbosity,
) -> io::Result<()> {
    writeln!(sink, "[{:#x}] {} record", header.offset, header.signature_str())?;
    if verbosity >= DumpVerbosity::Fields {
        match record {
            Record::Comment(c) => {
                writeln!(sink, "  text: {:?}", String::from_utf8_lossy(&c.text))?;
            }
            Record::Checkout(c) => {
                writeln!(sink, "  project_path: {}", c.project_path)?;
                writeln!(sink, "  user: {}", c.user)?;
                writeln!(sink, "  revision_num: {}", c.revision_num)?;
            }
            Record::Project(p) => {
                writeln!(sink, "  parent: {}", p.parent_physical_name)?;
                writeln!(sink, "  prev_project_offset: {:#x}", p.prev_project_offset)?;
            }
            Record::Branch(b) => {
                writeln!(sink, "  parent: {}", b.parent_physical_name)?;
                writeln!(sink, "  prev_branch_offset: {:#x}", b.prev_branch_offset)?;
            }
            Record::Delta(d) => {
                writeln!(sink, "  ops: {}", d.ops.len())?;
                writeln!(sink, "  log_data: {} bytes", d.log_data.len())?;
            }
            Record::Revision(r) => {
                writeln!(sink, "  action: {:?}", r.action)?;
                writeln!(sink, "  rev_num: {}", r.rev_num)?;
                writeln!(sink, "  user: {}", r.user)?;
            }
            Record::Name(n) => {
                writeln!(sink, "  entries: {}", n.entries.len())?;
            }
        }
    }
    if verbosity >= DumpVerbosity::Raw {
        writeln!(sink, "  length: {}", header.length)?;
        writeln!(sink, "  crc: {:#06x}", header.crc)?;
    }
    Ok(())
}

/// Writes one action's section to `sink`.
pub fn dump_action(sink: &mut dyn Write, action: &Action, verbosity: DumpVerbosity) -> io::Result<()> {
    writeln!(sink, "[{}] {}", action.timestamp, action.description())?;
    if verbosity >= DumpVerbosity::Fields {
        writeln!(sink, "  user: {}", action.user)?;
        writeln!(sink, "  physical_name: {}", action.physical_name)?;
        writeln!(sink, "  version: {}", action.version)?;
        if let Some(comment) = &action.comment {
            writeln!(sink, "  comment: {comment:?}")?;
        }
        if let Some(label) = &action.label {
            writeln!(sink, "  label: {label:?}")?;
        }
    }
    if verbosity >= DumpVerbosity::Raw {
        writeln!(sink, "  base_path: {}", action.base_path)?;
    }
    for error in &action.errors {
        writeln!(sink, "  ! {error}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionExtra;
    use crate::fullname::PhysicalName;

    #[test]
    fn dump_action_summary_is_one_line_plus_errors() {
        let action = Action {
            timestamp: 42,
            user: "bob".into(),
            base_path: String::new(),
            name: "foo.txt".into(),
            physical_name: PhysicalName::from_str("AAAAAAAA").unwrap(),
            comment: None,
            label: None,
            version: 1,
            extra: ActionExtra::Create,
            errors: vec!["dangling offset".into()],
        };
        let mut out = Vec::new();
        dump_action(&mut out, &action, DumpVerbosity::Summary).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("created foo.txt"));
        assert!(text.contains("dangling offset"));
        assert!(!text.contains("physical_name"));
    }

    #[test]
    fn verbosity_from_count_caps_at_raw() {
        assert_eq!(DumpVerbosity::from_count(0), DumpVerbosity::Summary);
        assert_eq!(DumpVerbosity::from_count(1), DumpVerbosity::Fields);
        assert_eq!(DumpVerbosity::from_count(5), DumpVerbosity::Raw);
    }
}
