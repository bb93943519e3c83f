use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use showctl::flag::{bind_fn, Flag, FlagBoard};
use showctl::script::token::{parse, Command};
use showctl::script::Interpreter;

fn key() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}"
}

/// Values as they can appear on a line: a bare word, or anything without a
/// quote or newline (written quoted).
fn value() -> impl Strategy<Value = String> {
    prop_oneof!["[A-Za-z0-9._/-]{1,12}", "[^\"\n\r]{0,20}"]
}

proptest! {
    /// Parsing the canonical form of a command gives back the same command.
    #[test]
    fn tokenizer_round_trip(
        name in "[a-z]{1,10}",
        args in proptest::collection::btree_map(key(), value(), 0..6),
    ) {
        let cmd = Command { name, args };
        prop_assert_eq!(parse(&cmd.to_line()), cmd);
    }
}

proptest! {
    /// Command names and keys compare case-insensitively; values do not.
    #[test]
    fn case_folding(name in "[A-Za-z]{1,10}", k in "[A-Za-z]{1,8}", v in "[A-Za-z]{1,8}") {
        let c = parse(&format!("{name} {k} {v}"));
        prop_assert_eq!(&c.name, &name.to_lowercase());
        prop_assert_eq!(c.get(&k.to_lowercase()), Some(v.as_str()));
    }
}

proptest! {
    /// The tokenizer is total: any input parses without panicking.
    #[test]
    fn parser_does_not_panic(s in "\\PC*") {
        let _ = parse(&s);
    }
}

proptest! {
    /// Executing arbitrary text never panics and never leaves a stale error.
    #[test]
    fn execute_does_not_panic(s in "[ -~]{0,60}") {
        let mut interp = Interpreter::default();
        match interp.execute(&s) {
            Ok(_) => prop_assert!(interp.last_error().is_none()),
            Err(e) => prop_assert_eq!(interp.last_error(), Some(&e)),
        }
    }
}

proptest! {
    /// Two toggles with nothing in between restore the collaborator's state.
    #[test]
    fn double_toggle_restores(initial in any::<bool>(), idx in 0usize..Flag::NAMES.len()) {
        let (name, flag) = Flag::NAMES[idx];
        let state = Rc::new(Cell::new(initial));
        let (r, w) = (state.clone(), state.clone());
        let mut board = FlagBoard::new();
        board.bind(flag, bind_fn(move || r.get(), move |on| w.set(on)));

        prop_assert_eq!(board.set_flag(name, "toggle").unwrap(), !initial);
        prop_assert_eq!(state.get(), !initial);
        board.set_flag(name, "toggle").unwrap();
        prop_assert_eq!(state.get(), initial);
    }
}

proptest! {
    /// `comment` is a switch, not a counter.
    #[test]
    fn comment_is_idempotent(n in 1usize..6) {
        let mut interp = Interpreter::default();
        for _ in 0..n {
            interp.execute("comment").unwrap();
        }
        interp.execute("uncomment").unwrap();
        prop_assert!(!interp.control().is_suppressed());
    }
}
