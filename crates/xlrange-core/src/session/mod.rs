//! Workbook/sheet/range model over one engine adapter.

mod effects;
mod ops;
mod range;
mod state;
mod table;

pub use ops::Font;
pub use range::Range;
pub use state::{Session, Sheet, Workbook};
pub use table::{FormatRule, Outline};
