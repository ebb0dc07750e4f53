use indexmap::{IndexMap, IndexSet};

use crate::analysis::usedef::SLOT_SIZE;

use super::regs::ARG_REGS;

/// Depth below `%rbp` of incoming argument `index`. Arguments passed on the
/// stack sit above the saved frame pointer and return address, so their
/// depth is negative.
pub fn argument_depth(index: usize) -> i64 {
    let stacked = index.saturating_sub(ARG_REGS.len()) as i64;
    -(stacked * SLOT_SIZE + 16)
}

/// Frame layout of one function: every stack-allocated local gets an 8-byte
/// slot, numbered from 8 in the order the allocas appear.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackFrame {
    depths: IndexMap<String, i64>,
    size: i64,
}

impl StackFrame {
    pub fn plan(allocas: &IndexSet<String>) -> Self {
        let depths: IndexMap<String, i64> = allocas
            .iter()
            .zip(1..)
            .map(|(name, slot)| (name.clone(), slot * SLOT_SIZE))
            .collect();
        let size = SLOT_SIZE * depths.len() as i64;
        Self { depths, size }
    }

    pub fn contains(&self, local: &str) -> bool {
        self.depths.contains_key(local)
    }

    pub fn depth(&self, local: &str) -> Option<i64> {
        self.depths.get(local).copied()
    }

    /// `%rbp`-relative displacement, as written in an address operand.
    pub fn displacement(&self, local: &str) -> Option<i64> {
        self.depth(local).map(|depth| -depth)
    }

    /// Points `local` at a stack-passed argument instead of its own slot.
    /// The slot keeps its space in the frame.
    pub fn bind_argument(&mut self, local: &str, index: usize) {
        if let Some(depth) = self.depths.get_mut(local) {
            *depth = argument_depth(index);
        }
    }

    /// Bytes reserved below the frame pointer.
    pub fn size(&self) -> i64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locals(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_slots_in_allocation_order() {
        let frame = StackFrame::plan(&locals(&["x", "y", "z"]));
        assert_eq!(frame.depth("x"), Some(8));
        assert_eq!(frame.depth("y"), Some(16));
        assert_eq!(frame.depth("z"), Some(24));
        assert_eq!(frame.displacement("z"), Some(-24));
        assert_eq!(frame.size(), 24);
        assert!(!frame.contains("w"));
    }

    #[test]
    fn test_empty_frame() {
        let frame = StackFrame::plan(&IndexSet::new());
        assert_eq!(frame.size(), 0);
    }

    #[test]
    fn test_argument_depth() {
        assert_eq!(argument_depth(4), -16);
        assert_eq!(argument_depth(5), -24);
        assert_eq!(argument_depth(7), -40);
    }

    #[test]
    fn test_bind_argument_keeps_frame_size() {
        let mut frame = StackFrame::plan(&locals(&["a", "e"]));
        frame.bind_argument("e", 5);
        assert_eq!(frame.displacement("e"), Some(24));
        assert_eq!(frame.displacement("a"), Some(-8));
        assert_eq!(frame.size(), 16);

        frame.bind_argument("missing", 4);
        assert!(!frame.contains("missing"));
    }
}
