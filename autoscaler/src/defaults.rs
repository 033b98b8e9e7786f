//! Idempotent spec normalization applied at the top of every reconciliation
//! cycle, before any metric is fetched. Grounded in `scale/defaults_updater.go`:
//! fill an absent or non-positive stabilization window with the process
//! default, and fill missing behavior rules so the normalizer never has to
//! special-case an absent side or an absent select policy. Negative
//! min/max replica bounds need no clamping here — `ScalingSpec`'s fields
//! are `u32`, so that Open Question is resolved by the type system rather
//! than at runtime.

use resources::objects::scaling::{PolicySelection, ScaleRules, ScalingBehavior, ScalingSpec};

pub struct DefaultsUpdater {
    stabilization_window_seconds: u32,
}

impl DefaultsUpdater {
    pub fn new(stabilization_window_seconds: u32) -> Self {
        Self {
            stabilization_window_seconds,
        }
    }

    pub fn apply(&self, spec: &mut ScalingSpec) {
        self.update_stabilization_window(spec);
        self.update_scale_rules(spec);
    }

    fn update_stabilization_window(&self, spec: &mut ScalingSpec) {
        if spec.stabilization_window_seconds == 0 {
            spec.stabilization_window_seconds = self.stabilization_window_seconds;
        }
    }

    fn update_scale_rules(&self, spec: &mut ScalingSpec) {
        let behavior = spec.behavior.get_or_insert_with(ScalingBehavior::default);

        match &mut behavior.scale_up {
            Some(rules) => self.fill_rules(rules, PolicySelection::Max),
            None => {
                behavior.scale_up = Some(disabled_rules());
            },
        }

        match &mut behavior.scale_down {
            Some(rules) => self.fill_rules(rules, PolicySelection::Min),
            None => {
                behavior.scale_down = Some(disabled_rules());
            },
        }
    }

    /// Fills an explicit-but-incomplete `ScaleRules`: an absent
    /// `selectPolicy` resolves to `default_select_policy` (the direction's
    /// own default, not a single shared one — scaling up defaults to `Max`,
    /// scaling down to `Min`), and the stabilization window is filled with
    /// the process default unless the (now-resolved) policy is `Disabled`.
    fn fill_rules(&self, rules: &mut ScaleRules, default_select_policy: PolicySelection) {
        let select_policy = rules.select_policy.unwrap_or(default_select_policy);
        rules.select_policy = Some(select_policy);

        if rules.stabilization_window_seconds == 0 && select_policy != PolicySelection::Disabled {
            rules.stabilization_window_seconds = self.stabilization_window_seconds;
        }
    }
}

fn disabled_rules() -> ScaleRules {
    ScaleRules {
        stabilization_window_seconds: 0,
        select_policy: Some(PolicySelection::Disabled),
        policies: Vec::new(),
    }
}
