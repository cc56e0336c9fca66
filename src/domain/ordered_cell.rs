//! The ordered engine's six-bit cell encoding (spec.md §3, §4.4).
//!
//! Bit 0 — current live state. Bit 1 — live state of the immediate
//! row-major left neighbour ("prev"). Bits 2..5 — live-neighbour count
//! (0..=8). The byte is stored plain, one per cell, never packed into
//! nibbles; this mirrors the reference implementation's
//! `(nei << 2) | (prev << 1) | state` layout (see
//! `examples/original_source/EX1/GoL_parallel_init_evol.c`), but hides
//! the layout behind accessors per the spec's redesign note so the
//! internal bit arrangement is unobservable outside this module.

use super::rule::{ConwayRule, Rule};

/// A single ordered-engine cell byte.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct OrderedCell(u8);

const STATE_BIT: u8 = 1 << 0;
const LEFT_BIT: u8 = 1 << 1;
const COUNT_SHIFT: u8 = 2;

impl OrderedCell {
    pub fn new(count: u8, left: bool, state: bool) -> Self {
        debug_assert!(count <= 8, "neighbour count out of range: {count}");
        Self((count << COUNT_SHIFT) | ((left as u8) << 1) | (state as u8))
    }

    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    #[inline]
    pub fn byte(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn state(self) -> bool {
        self.0 & STATE_BIT != 0
    }

    #[inline]
    pub fn left(self) -> bool {
        self.0 & LEFT_BIT != 0
    }

    #[inline]
    pub fn count(self) -> u8 {
        self.0 >> COUNT_SHIFT
    }

    #[inline]
    pub fn set_state(&mut self, alive: bool) {
        if alive {
            self.0 |= STATE_BIT;
        } else {
            self.0 &= !STATE_BIT;
        }
    }

    #[inline]
    pub fn set_left(&mut self, alive: bool) {
        if alive {
            self.0 |= LEFT_BIT;
        } else {
            self.0 &= !LEFT_BIT;
        }
    }

    /// Adjusts the neighbour count by `delta` (`-1`, `0` or `+1`), as
    /// prescribed for the eight surrounding cells of an updated cell.
    #[inline]
    pub fn bump_count(&mut self, delta: i8) {
        let count = self.count() as i8 + delta;
        debug_assert!((0..=8).contains(&count), "neighbour count overflow: {count}");
        self.0 = ((count as u8) << COUNT_SHIFT) | (self.0 & (STATE_BIT | LEFT_BIT));
    }

    /// Applies Conway's B3/S23 to this cell's `state`/`count` fields,
    /// ignoring `left` entirely — the ordered engine's general update
    /// rule never consults the left-neighbour bit to decide a cell's
    /// own next state; it is maintained solely for the invariant
    /// checked by [`crate::engine::ordered_engine::self_check`].
    #[inline]
    pub fn general_next_state(self) -> bool {
        ConwayRule.evolve(self.state(), self.count())
    }
}

/// Returns `true` iff `byte` belongs to the line-independent set
/// (spec.md §4.4):
///
/// `{ v : v < 4 } ∪ { v : v > 19 } ∪ { 4, 6, 7, 9, 10, 15, 16, 17 }`
///
/// A line-independent byte may start a new parallel fragment: the
/// ordered engine's "first cell of a non-first fragment" shortcut
/// (`new state = 1` iff `byte == 9 || byte == 15`) is only valid for
/// bytes in this set — see the test below for the property that
/// licenses it.
#[inline]
pub fn is_line_independent(byte: u8) -> bool {
    byte < 4 || byte > 19 || matches!(byte, 4 | 6 | 7 | 9 | 10 | 15 | 16 | 17)
}

/// The simplified first-cell-of-a-fragment rule from spec.md §4.4 step 2:
/// valid only for [`is_line_independent`] bytes.
#[inline]
pub fn line_independent_next_state(byte: u8) -> bool {
    byte == 9 || byte == 15
}
