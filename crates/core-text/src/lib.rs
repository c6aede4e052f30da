//! Rune codec and paged gap buffer (spec components C1 and C2).

pub mod buf;
pub mod rune;
pub mod width;

pub use buf::{Buf, PAGE_CAPACITY};
pub use rune::{NEWLINE, NORUNE, Rune, WRONGRUNE, decode, encode, rune_len};
pub use width::rune_width;
