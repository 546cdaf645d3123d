mod common;

use rtspice_core::runtime::DIAGNOSTICS_CAPACITY;
use rtspice_core::{channel, Diagnostic, SimulatorConfig};

#[test]
fn test_program_published_from_another_thread() {
    let (mut engine, mut processor) = channel(48000.0, SimulatorConfig::default());

    crossbeam::thread::scope(|s| {
        s.spawn(|_| engine.load(&common::passthrough()).unwrap());
    })
    .unwrap();

    let mut out = [0.0f32; 4];
    processor.process_block(&[0.1, 0.2, 0.3, 0.4], &mut out);
    assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
    assert!(processor.is_loaded());
}

#[test]
fn test_audio_thread_swaps_at_block_boundary() {
    let (mut engine, processor) = channel(48000.0, SimulatorConfig::default());
    engine.load(&common::passthrough()).unwrap();

    let processor = crossbeam::thread::scope(|s| {
        s.spawn(move |_| {
            let mut processor = processor;
            let mut out = [0.0f32; 8];
            processor.process_block(&[0.5; 8], &mut out);
            assert_eq!(out, [0.5; 8]);
            processor
        })
        .join()
        .unwrap()
    })
    .unwrap();

    // Swapping in the RC filter retires the passthrough program
    let mut processor = processor;
    engine.load(&common::rc_lowpass(1e3, 1e-6)).unwrap();
    let mut out = [0.0f32; 8];
    processor.process_block(&[1.0; 8], &mut out);
    assert!(out[0] > 0.0 && out[0] < 0.1);
    assert_eq!(engine.collect_retired(), 1);

    let mut seen: Vec<Diagnostic> = Vec::new();
    engine.drain_diagnostics(&mut seen);
    assert!(seen.iter().all(|d| matches!(d, Diagnostic::SystemSwapped { .. })));
    assert_eq!(seen.len(), 2);
}

#[test]
fn test_step_failures_reach_the_engine() {
    let config = SimulatorConfig::new().with_max_iterations(1);
    let (mut engine, mut processor) = channel(48000.0, config);
    engine.load(&common::biased_diode()).unwrap();

    let mut out = [0.0f32; 4];
    processor.process_block(&[1.0; 4], &mut out);

    let mut seen: Vec<Diagnostic> = Vec::new();
    assert_eq!(engine.drain_diagnostics(&mut seen), 5);
    assert!(matches!(seen[0], Diagnostic::SystemSwapped { .. }));
    assert!(seen[1..].iter().all(Diagnostic::is_step_failure));
    assert!(matches!(seen[1], Diagnostic::ConvergenceFailure { step: 0, .. }));
    assert!(matches!(seen[4], Diagnostic::ConvergenceFailure { step: 3, .. }));
}

#[test]
fn test_full_diagnostics_channel_counts_drops() {
    let config = SimulatorConfig::new().with_max_iterations(1);
    let (mut engine, mut processor) = channel(48000.0, config);
    engine.load(&common::biased_diode()).unwrap();

    let frames = DIAGNOSTICS_CAPACITY + 44;
    let input = vec![1.0f32; frames];
    let mut out = vec![0.0f32; frames];
    processor.process_block(&input, &mut out);
    assert_eq!(processor.dropped_diagnostics(), 45);

    let mut seen: Vec<Diagnostic> = Vec::new();
    assert_eq!(engine.drain_diagnostics(&mut seen), DIAGNOSTICS_CAPACITY);
}
