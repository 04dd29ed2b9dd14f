//! End-to-end scenarios for the single-photon and entangled key distribution runs.

use polarqkd::errors::{ProtocolError, SimulationError};
use polarqkd::protocols::{bb84, e91};
use polarqkd::{CorrelationAnalyzer, Observer, PolarizationState, SimulationConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

fn seeded(num_trials: usize, seed: u64) -> SimulationConfig {
    SimulationConfig {
        num_trials,
        seed: Some(seed),
        ..Default::default()
    }
}

#[test]
fn single_photon_scenario_without_eve_is_fully_correlated() {
    let config = bb84::Bb84Config {
        simulation: seeded(1000, 1),
        ..Default::default()
    };
    let mut rng = config.simulation.rng();

    let result = bb84::run(&config, &mut rng).unwrap();

    assert_eq!(result.shared_key.sifted_length(), 1000);
    assert!((result.shared_key.correlation - 1.0).abs() < 0.05);
    assert_eq!(result.shared_key.qber(), 0.0);
    assert!(!result.eavesdropping.suspected);
}

#[test]
fn single_photon_scenario_with_eve_is_detected() {
    let clean_config = bb84::Bb84Config {
        simulation: seeded(1000, 2),
        ..Default::default()
    };
    let tapped_config = clean_config.clone().with_eavesdropper(vec![0.0, FRAC_PI_4]);

    let clean = bb84::run(&clean_config, &mut clean_config.simulation.rng()).unwrap();
    let tapped = bb84::run(&tapped_config, &mut tapped_config.simulation.rng()).unwrap();

    // Eve guessing the diagonal basis scrambles half of Bob's bits
    assert!(tapped.shared_key.correlation < clean.shared_key.correlation - 0.2);
    assert!(tapped.shared_key.qber() > 10.0);
    assert!(tapped.eavesdropping.mean_deviation > 0.1);
    assert!(tapped.eavesdropping.suspected);
    assert_eq!(tapped.eve.map(|r| r.len()), Some(1000));
}

#[test]
fn entangled_scenario_without_eve_follows_theory() {
    let config = e91::E91Config {
        simulation: seeded(1000, 3),
        ..Default::default()
    };
    let mut rng = config.simulation.rng();

    let result = e91::run(&config, &mut rng).unwrap();

    assert_eq!(result.shared_key.key, result.shared_key.partner_key);
    assert!((result.shared_key.correlation - 1.0).abs() < 0.05);
    assert!(result.eavesdropping.mean_deviation < 0.1);
    assert!(!result.eavesdropping.suspected);
    assert_eq!(result.eavesdropping.samples.len(), 2);
}

#[test]
fn entangled_scenario_with_eve_breaks_correlations() {
    let config = e91::E91Config {
        simulation: seeded(1000, 4),
        ..Default::default()
    }
    .with_eavesdropper(e91::default_basis_angles());
    let mut rng = config.simulation.rng();

    let result = e91::run(&config, &mut rng).unwrap();

    assert!(result.shared_key.correlation < 0.8);
    assert!(result.shared_key.errors() > 0);
    assert!(result.eavesdropping.suspected);
}

#[test]
fn runs_are_reproducible_from_seed() {
    let config = e91::E91Config {
        simulation: seeded(300, 5),
        ..Default::default()
    };

    let first = e91::run(&config, &mut config.simulation.rng()).unwrap();
    let second = e91::run(&config, &mut config.simulation.rng()).unwrap();

    assert_eq!(first.alice, second.alice);
    assert_eq!(first.bob, second.bob);
    assert_eq!(first.shared_key, second.shared_key);
}

#[test]
fn zero_trials_abort_the_run() {
    let config = bb84::Bb84Config {
        simulation: seeded(0, 6),
        ..Default::default()
    };

    assert!(matches!(
        bb84::run(&config, &mut config.simulation.rng()),
        Err(SimulationError::ConfigurationError(_))
    ));
}

#[test]
fn identical_basis_sequences_share_the_whole_key() {
    // Alice and Bob reuse one fixed angle per trial, cycling through four of them
    let mut rng = StdRng::seed_from_u64(7);
    let angles = e91::default_basis_angles();
    let mut alice = Observer::new("Alice");
    let mut bob = Observer::new("Bob");

    for i in 0..1000 {
        let angle = angles[i % angles.len()];
        alice.set_basis_choices(vec![angle]).unwrap();
        bob.set_basis_choices(vec![angle]).unwrap();

        let mut qubit = PolarizationState::create_entangled_half(0.0, 1.0);
        alice.observe(&mut qubit, &mut rng).unwrap();
        bob.observe(&mut qubit, &mut rng).unwrap();
    }

    let shared = CorrelationAnalyzer::default()
        .extract_shared_key(alice.recording(), bob.recording())
        .unwrap();

    assert_eq!(shared.sifted_length(), 1000);
    assert_eq!(shared.key, shared.partner_key);
}

#[test]
fn manual_protocol_reuses_observers_after_reset() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut alice = Observer::new("Alice");
    let mut bob = Observer::new("Bob");

    for _ in 0..50 {
        let mut qubit = PolarizationState::create_entangled_half(0.0, 1.0);
        alice.observe(&mut qubit, &mut rng).unwrap();
        bob.observe(&mut qubit, &mut rng).unwrap();

        // A third party finds nothing left to measure
        let mut eve = Observer::new("Eve");
        assert_eq!(
            eve.observe(&mut qubit, &mut rng),
            Err(ProtocolError::AlreadyFullyMeasured)
        );
    }

    alice.reset_recording();
    bob.reset_recording();
    assert!(alice.recording().is_empty() && bob.recording().is_empty());

    let mut photon = PolarizationState::create_independent(FRAC_PI_2, 1.0).unwrap();
    alice.set_basis_choices(vec![PI / 2.0]).unwrap();
    assert_eq!(alice.observe(&mut photon, &mut rng), Ok(1));
    assert_eq!(alice.recording().len(), 1);
}
