//! Domain layer: cell encodings, rules and toroidal arithmetic shared
//! by both engines.

pub mod rule;
pub mod ordered_cell;
pub mod static_cell;
pub mod torus;

pub use rule::{Rule, ConwayRule, HighLifeRule, SeedsRule, DayAndNightRule, all_rules, default_rule};
pub use ordered_cell::{OrderedCell, is_line_independent, line_independent_next_state};
pub use static_cell::StaticCell;
