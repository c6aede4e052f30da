//! Windowing: line layout, scrolling, hit-testing, and frame tiling (spec
//! component C5, spec.md §4.5).

pub mod frame;
pub mod linelayout;
pub mod rect;
pub mod window;

pub use frame::{Dir, Frame};
pub use linelayout::{LineRing, RING_SIZE, layout_line, lineinfo};
pub use rect::{FSCALE, Rect, TAB_WIDTH};
pub use window::{CursorLoc, Tag, Window};
