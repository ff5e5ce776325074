//! Remembered-set support structures.
//!
//! Card-based tracking over a heap region: [`CardTable`] records which
//! 512-byte cards saw reference updates, [`CardFirstObjectTable`] finds
//! the cell overlapping any card's start, and [`CardTableRemSet`] ties
//! both to dead-space events so card walks keep working as the free list
//! churns.

mod card_rset;
mod card_table;
mod cfo_table;

pub use card_rset::CardTableRemSet;
pub use card_table::{
    align_down_to_card, align_up_to_card, CardTable, CARD_CLEAN, CARD_DIRTY, CARD_SIZE,
    LOG2_CARD_SIZE,
};
pub use cfo_table::CardFirstObjectTable;
