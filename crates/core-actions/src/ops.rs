//! Interpreting the operator+motion commands the modal parser (C7) hands
//! back rather than executing itself (spec.md §4.7: "everything else ...
//! is left to this crate's caller"). Only the delete operator (`d`+motion)
//! is wired up; `core-keymap::motion`'s own doc comment already notes no
//! other operator exists yet in this editing core.

use core_keymap::{Cmd, Motion, ParsedCommand};
use core_model::Window;
use core_state::EBuf;

/// Apply a parsed operator+motion command (`original_source/cmd.c`'s
/// `perform` falls through to nothing for these; the repeat count is the
/// product of the count typed before the operator and the count typed
/// before the motion, matching vi's own combination rule). Returns
/// `false` if `pc` names an operator this layer does not implement, so
/// the caller can surface `erroneous command` (spec.md §7).
pub fn apply_operator(eb: &mut EBuf, win: &mut Window, pc: ParsedCommand) -> bool {
    if pc.main.c != 'd' {
        return false;
    }
    let Some(motion_cmd) = pc.motion else { return false };
    let Some(motion) = Motion::from_rune(motion_cmd.c as u32) else { return false };
    let count = combined_count(&pc.main, &motion_cmd);

    let cu = win.cursor();
    let target = core_keymap::motion::apply(eb.buf_mut(), cu, motion, count);
    let (p0, p1) = if target > cu { (cu, target) } else { (target, cu) };
    if p1 > p0 {
        eb.del(p0, p1);
        eb.commit();
    }
    win.set_cursor(p0);
    true
}

fn combined_count(main: &Cmd, motion: &Cmd) -> u32 {
    main.count.max(1) * motion.count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::Rect;
    use core_text::Rune;

    fn filled(s: &str) -> EBuf {
        let mut e = EBuf::new();
        for (i, ch) in s.chars().enumerate() {
            e.ins(i, ch as Rune);
        }
        e.commit();
        e
    }

    fn win() -> Window {
        Window::new(Rect::new(0, 0, 80, 24), 16384)
    }

    #[test]
    fn delete_word_motion_removes_up_to_next_word_start() {
        let mut eb = filled("the quick fox\n");
        let mut w = win();
        let pc = ParsedCommand {
            buf: None,
            main: Cmd { count: 0, c: 'd', arg: None },
            motion: Some(Cmd { count: 0, c: 'w', arg: None }),
        };
        assert!(apply_operator(&mut eb, &mut w, pc));
        let rest: String =
            (0..eb.buf().len()).map(|i| eb.buf_mut().get(i)).filter_map(char::from_u32).collect();
        assert_eq!(rest, "quick fox\n");
        assert_eq!(w.cursor(), 0);
    }

    #[test]
    fn unknown_operator_is_not_handled() {
        let mut eb = filled("hello\n");
        let mut w = win();
        let pc = ParsedCommand {
            buf: None,
            main: Cmd { count: 0, c: 'y', arg: None },
            motion: Some(Cmd { count: 0, c: 'w', arg: None }),
        };
        assert!(!apply_operator(&mut eb, &mut w, pc));
    }
}
