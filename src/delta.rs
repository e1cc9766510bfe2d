//! The delta engine (spec.md §4.4): reconstructs a prior revision's bytes
//! from the later revision's content by replaying a chain of copy/insert
//! operations recorded in a [`DeltaPayload`].
//!
//! Every delta record describes exactly one step backward: given
//! `content_next` (the bytes of the revision immediately *after* the one
//! being reconstructed), [`apply`] replays the op stream and produces
//! `content_prev`. [`FileItem`](crate::item_file::file::FileItem) chains
//! these calls from the latest revision back to the first.

use crate::error::{Error, Result};
use crate::record::payload::{DeltaOpCode, DeltaPayload};

/// Applies one delta record against the later content, producing the
/// earlier content. `WriteLog` copies from the delta record's own inline
/// log data; `WriteSuccessor` copies from `content_next`. The op stream
/// must end in a `Stop`, which `DeltaPayload::parse` already guarantees.
pub fn apply(delta: &DeltaPayload, content_next: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for op in &delta.ops {
        match op.code {
            DeltaOpCode::WriteLog => {
                let start = op.offset as usize;
                let end = start.checked_add(op.size as usize).ok_or_else(|| {
                    Error::DeltaOutOfBounds(format!(
                        "WriteLog offset {start} + size {} overflows",
                        op.size
                    ))
                })?;
                let log = delta.log_data.get(start..end).ok_or_else(|| {
                    Error::DeltaOutOfBounds(format!(
                        "WriteLog range {start}..{end} exceeds log data of {} bytes",
                        delta.log_data.len()
                    ))
                })?;
                out.extend_from_slice(log);
            }
            DeltaOpCode::WriteSuccessor => {
                let start = op.offset as usize;
                let end = start.checked_add(op.size as usize).ok_or_else(|| {
                    Error::DeltaOutOfBounds(format!(
                        "WriteSuccessor offset {start} + size {} overflows",
                        op.size
                    ))
                })?;
                let slice = content_next.get(start..end).ok_or_else(|| {
                    Error::DeltaOutOfBounds(format!(
                        "WriteSuccessor range {start}..{end} exceeds successor content of {} bytes",
                        content_next.len()
                    ))
                })?;
                out.extend_from_slice(slice);
            }
            DeltaOpCode::Stop => break,
        }
    }
    Ok(out)
}
