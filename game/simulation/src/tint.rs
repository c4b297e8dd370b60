/// The action-tint backchannel: a single per-tile structure feeding
/// both the observation `Tint` layer and (were a renderer attached) tile colouring, so the two
/// can never diverge from a single countdown decrement.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TintKind {
    Heal,
    Death,
    Attack,
    /// The clippy-purple frozen tint emitted by tumors; while active the tile is impassable and
    /// non-interactable.
    Frozen,
}

impl TintKind {
    /// Stable small integer written into the observation `Tint` layer.
    pub fn layer_code(self) -> i32 {
        match self {
            TintKind::Heal => 1,
            TintKind::Death => 2,
            TintKind::Attack => 3,
            TintKind::Frozen => 4,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Tint {
    active: Option<(TintKind, u32)>,
}

impl Tint {
    pub fn apply(&mut self, kind: TintKind, ticks: u32) {
        self.active = Some((kind, ticks));
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.active, Some((TintKind::Frozen, ticks)) if ticks > 0)
    }

    pub fn kind(&self) -> Option<TintKind> {
        self.active.map(|(k, _)| k)
    }

    pub fn layer_code(&self) -> i32 {
        self.active.map(|(k, _)| k.layer_code()).unwrap_or(0)
    }

    /// Decrements the countdown once; clears the tint (and any frozen flag it carried) once it
    /// reaches zero. Called exactly once per tick, before any action is applied.
    pub fn decay(&mut self) -> bool {
        let mut changed = false;
        if let Some((_, ticks)) = &mut self.active {
            if *ticks == 0 {
                self.active = None;
                changed = true;
            } else {
                *ticks -= 1;
                if *ticks == 0 {
                    self.active = None;
                    changed = true;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tint_expires_after_countdown() {
        let mut t = Tint::default();
        t.apply(TintKind::Death, 3);
        assert!(!t.decay()); // 3 -> 2
        assert!(!t.decay()); // 2 -> 1
        assert!(t.decay()); // 1 -> 0, expires
        assert_eq!(t.kind(), None);
    }

    #[test]
    fn frozen_tint_reports_impassable() {
        let mut t = Tint::default();
        t.apply(TintKind::Frozen, 1);
        assert!(t.is_frozen());
        t.decay();
        assert!(!t.is_frozen());
    }
}
