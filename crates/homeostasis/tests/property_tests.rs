//! Property-based tests for the homeostatic self model.
//!
//! Verifies that energy, mood and confidence stay within their documented
//! bounds for arbitrary operation sequences, and that the decay and
//! convergence laws hold for arbitrary parameters.

use std::time::Duration;

use proptest::prelude::*;
use sentia_core::HomeostasisConfig;
use sentia_homeostasis::SelfModel;
use tokio::time::Instant;

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Tick { millis: u64, events: Vec<String> },
    Sentiment(f64),
    Action { success: bool },
    Turn(String),
}

fn arb_event() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("input_keyboard_input".to_string()),
        Just("respond_success".to_string()),
        Just("respond_failure".to_string()),
        Just("positive_user_interaction".to_string()),
        Just("negative_user_interaction".to_string()),
        "[a-z_]{1,12}",
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..120_000, prop::collection::vec(arb_event(), 0..4))
            .prop_map(|(millis, events)| Op::Tick { millis, events }),
        (-50.0f64..50.0).prop_map(Op::Sentiment),
        any::<bool>().prop_map(|success| Op::Action { success }),
        "[a-z ]{0,16}".prop_map(Op::Turn),
    ]
}

fn arb_config() -> impl Strategy<Value = HomeostasisConfig> {
    (0.0f64..5.0, 0.0f64..=1.0, 0.0f64..=1.0).prop_map(|(rate, stability, threshold)| {
        HomeostasisConfig {
            energy_decay_rate: rate,
            mood_stability: stability,
            confidence_threshold: threshold,
        }
    })
}

// ============================================================================
// Bound Properties
// ============================================================================

proptest! {
    /// **Core invariant**: after any sequence of operations every scalar is in
    /// range and at most ten events are retained.
    #[test]
    fn scalars_stay_in_bounds(config in arb_config(), ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut model = SelfModel::new(config);
        let mut clock = Instant::now();

        for op in ops {
            match op {
                Op::Tick { millis, events } => {
                    clock += Duration::from_millis(millis);
                    let refs: Vec<&str> = events.iter().map(String::as_str).collect();
                    model.update_at(clock, &refs);
                }
                Op::Sentiment(score) => model.update_mood_from_sentiment(score),
                Op::Action { success } => model.record_action_impact("respond", success),
                Op::Turn(text) => model.add_to_conversation_history(sentia_core::TurnRole::User, text),
            }

            let state = model.state();
            prop_assert!((0.0..=100.0).contains(&state.energy), "energy {}", state.energy);
            prop_assert!((-1.0..=1.0).contains(&state.mood), "mood {}", state.mood);
            prop_assert!((0.0..=1.0).contains(&state.confidence), "confidence {}", state.confidence);
            prop_assert!(state.recent_events.len() <= 10);
            prop_assert!(model.recent_conversation_history().len() <= 10);
        }
    }

    /// Energy after one update is exactly `max(0, e0 - rate * dt)`.
    #[test]
    fn energy_decay_law(rate in 0.0f64..10.0, secs in 0u64..100_000) {
        let config = HomeostasisConfig { energy_decay_rate: rate, ..HomeostasisConfig::default() };
        let mut model = SelfModel::new(config);
        let start = Instant::now();
        let initial = model.update_at(start, &[]).energy;

        let state = model.update_at(start + Duration::from_secs(secs), &[]);
        let expected = (initial - rate * secs as f64).max(0.0);
        prop_assert!((state.energy - expected).abs() < 1e-6);
    }

    /// Repeated updates with no events converge mood monotonically to 0.5.
    #[test]
    fn mood_converges_to_set_point(stability in 0.01f64..=1.0, push in -20.0f64..20.0) {
        let config = HomeostasisConfig { mood_stability: stability, ..HomeostasisConfig::default() };
        let mut model = SelfModel::new(config);
        model.update_mood_from_sentiment(push);

        let now = Instant::now();
        let mut distance = (model.state().mood - 0.5).abs();
        for _ in 0..50 {
            let mood = model.update_at(now, &[]).mood;
            let next = (mood - 0.5).abs();
            prop_assert!(next <= distance + 1e-12);
            distance = next;
        }
    }

    /// The retained events are always the most recent ones, oldest first.
    #[test]
    fn events_evicted_fifo(count in 0usize..40) {
        let mut model = SelfModel::default();
        let names: Vec<String> = (0..count).map(|i| format!("e{i}")).collect();
        for name in &names {
            model.update(&[name.as_str()]);
        }

        let keep = count.min(10);
        let expected: Vec<String> = names[count - keep..].to_vec();
        prop_assert_eq!(model.state().recent_events, expected);
    }
}
