/// A `(canStart, shouldTerminate, act)` triple — the unit of scripted behaviour this controller
/// is built from.
///
/// An `Opt` is selected by a first-match policy rather than scored like a utility curve: an
/// options list is walked in order and the first whose `can_start` returns true wins.
///
/// `B` is the blackboard an option reads and writes; `A` is the action it produces. Both are
/// plain type parameters rather than an associated-type `Context`, because the blackboard used
/// by the real controller borrows fresh from the engine every tick and so carries a lifetime
/// that changes on every call — see [`choose`].
pub trait Opt<B, A> {
    /// Whether this option is currently applicable. Called every tick an option is not already
    /// running, and also used to re-validate the currently running option.
    fn can_start(&self, blackboard: &B) -> bool;

    /// Whether a currently-running instance of this option should be abandoned in favour of
    /// re-selecting from the top of the list. Most options never interrupt themselves; the
    /// default is `false`.
    fn should_terminate(&self, _blackboard: &B) -> bool {
        false
    }

    /// Produce this tick's action. Only called when this option has been selected.
    fn act(&self, blackboard: &mut B) -> A;

    fn name(&self) -> &'static str;
}

pub type BoxedOpt<B, A> = Box<dyn Opt<B, A>>;

/// Re-validates the currently selected option (if any) before falling through to a fresh
/// top-to-bottom scan, so a running option keeps control for as long as it remains applicable
/// and doesn't ask to terminate.
///
/// `current` is owned by the caller rather than by this function or by the blackboard, so it
/// can persist across ticks even though the blackboard itself is rebuilt from scratch every
/// tick from short-lived borrows of the engine's state. Returns the name of the option that was
/// selected, for logging/testing.
pub fn choose<B, A>(options: &[BoxedOpt<B, A>], current: &mut Option<usize>, blackboard: &mut B) -> (&'static str, A) {
    assert!(!options.is_empty(), "an options list must not be empty");

    if let Some(idx) = *current {
        let opt = &options[idx];
        if !opt.should_terminate(blackboard) && opt.can_start(blackboard) {
            return (opt.name(), opt.act(blackboard));
        }
    }

    let idx = options
        .iter()
        .position(|opt| opt.can_start(blackboard))
        .unwrap_or(options.len() - 1); // last option is expected to be a catch-all

    *current = Some(idx);
    let opt = &options[idx];
    (opt.name(), opt.act(blackboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFalse;
    impl Opt<i32, &'static str> for AlwaysFalse {
        fn can_start(&self, _: &i32) -> bool {
            false
        }
        fn act(&self, _: &mut i32) -> &'static str {
            "never"
        }
        fn name(&self) -> &'static str {
            "AlwaysFalse"
        }
    }

    struct Positive;
    impl Opt<i32, &'static str> for Positive {
        fn can_start(&self, bb: &i32) -> bool {
            *bb > 0
        }
        fn act(&self, bb: &mut i32) -> &'static str {
            *bb -= 1;
            "positive"
        }
        fn name(&self) -> &'static str {
            "Positive"
        }
    }

    struct CatchAll;
    impl Opt<i32, &'static str> for CatchAll {
        fn can_start(&self, _: &i32) -> bool {
            true
        }
        fn act(&self, _: &mut i32) -> &'static str {
            "catch-all"
        }
        fn name(&self) -> &'static str {
            "CatchAll"
        }
    }

    fn options() -> Vec<BoxedOpt<i32, &'static str>> {
        vec![Box::new(AlwaysFalse), Box::new(Positive), Box::new(CatchAll)]
    }

    #[test]
    fn first_matching_option_wins() {
        let opts = options();
        let mut current = None;
        let mut bb = 2;
        let (name, action) = choose(&opts, &mut current, &mut bb);
        assert_eq!(name, "Positive");
        assert_eq!(action, "positive");
        assert_eq!(bb, 1);
    }

    #[test]
    fn falls_through_to_catch_all() {
        let opts = vec![Box::new(AlwaysFalse) as BoxedOpt<i32, &'static str>, Box::new(CatchAll)];
        let mut current = None;
        let mut bb = 0;
        let (name, _) = choose(&opts, &mut current, &mut bb);
        assert_eq!(name, "CatchAll");
    }

    #[test]
    fn running_option_keeps_control_until_it_no_longer_applies() {
        let opts = vec![Box::new(Positive) as BoxedOpt<i32, &'static str>, Box::new(CatchAll)];
        let mut current = None;
        let mut bb = 1;
        let (name, _) = choose(&opts, &mut current, &mut bb);
        assert_eq!(name, "Positive");
        assert_eq!(bb, 0);

        // Positive.can_start is now false, falls through
        let (name, _) = choose(&opts, &mut current, &mut bb);
        assert_eq!(name, "CatchAll");
    }

    #[test]
    fn reset_forces_rescan() {
        let opts = vec![Box::new(Positive) as BoxedOpt<i32, &'static str>, Box::new(CatchAll)];
        let mut current = None;
        let mut bb = 5;
        choose(&opts, &mut current, &mut bb);
        current = None;
        let (name, _) = choose(&opts, &mut current, &mut bb);
        assert_eq!(name, "Positive");
    }
}
