//! Selection commit: the one step that mutates the live document.

use std::cell::RefCell;

use crate::error::RangeError;
use crate::tree::{ContentTree, Node};
use crate::types::SelectionSnapshot;

/// Shared access to the live document.
///
/// All reads and the single write of a run go through here. Nothing is held
/// across an await point, so a plain `RefCell` is enough for a
/// single-threaded host.
pub trait LiveDocument {
    fn read<R>(&self, f: impl FnOnce(&ContentTree) -> R) -> R;
    fn write<R>(&self, f: impl FnOnce(&mut ContentTree) -> R) -> R;
}

impl LiveDocument for RefCell<ContentTree> {
    fn read<R>(&self, f: impl FnOnce(&ContentTree) -> R) -> R {
        f(&self.borrow())
    }

    fn write<R>(&self, f: impl FnOnce(&mut ContentTree) -> R) -> R {
        f(&mut self.borrow_mut())
    }
}

impl<D: LiveDocument> LiveDocument for std::rc::Rc<D> {
    fn read<R>(&self, f: impl FnOnce(&ContentTree) -> R) -> R {
        (**self).read(f)
    }

    fn write<R>(&self, f: impl FnOnce(&mut ContentTree) -> R) -> R {
        (**self).write(f)
    }
}

/// Replace the snapshot's range with `nodes`.
///
/// A range that no longer resolves is rejected and the tree is left as is.
/// A range that resolves but now covers different text is still replaced:
/// a concurrent run may have committed over it first.
pub fn commit(
    doc: &impl LiveDocument,
    snapshot: &SelectionSnapshot,
    nodes: Vec<Node>,
) -> Result<(), RangeError> {
    doc.write(|tree| {
        let current = tree.range_text(&snapshot.range)?;
        if current != snapshot.text {
            tracing::warn!(
                expected = %snapshot.text.escape_debug(),
                found = %current.escape_debug(),
                "selection changed since it was captured, committing anyway"
            );
        }
        tree.replace_range(&snapshot.range, nodes)?;
        tracing::debug!(start = ?snapshot.range.start, end = ?snapshot.range.end, "committed");
        Ok(())
    })
}
