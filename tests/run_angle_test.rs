//! End-to-end measurement sequencing against a recording sink.

use refl_control::hardware::mock::{FixedIdentity, FixedOrientation, RecordingSink};
use refl_control::instrument::polarization::{DOWN_FRAMES, FLIPPER_STATE, POLARISER_AMP, UP_FRAMES};
use refl_control::instrument::{Instrument, InstrumentSettings, PolarizationFrames};
use refl_control::limits::{Orientation, PolarizationMode};
use refl_control::profile::GENERIC_BEAMLINE;
use refl_control::sample::Sample;
use refl_control::sequencer::{RunAngle, RunKind, SequencerState, SlitConfiguration};
use refl_control::slit::{settings, SlitId, SlitSettings, SlitValue};
use refl_control::{ErrorKind, ReflError};

fn instrument(
    beamline: &str,
    settings: InstrumentSettings,
    orientation: Orientation,
) -> (Instrument, RecordingSink) {
    let sink = RecordingSink::new();
    let instrument = Instrument::init(
        &settings,
        Box::new(sink.clone()),
        &FixedIdentity::new(beamline),
        &FixedOrientation(orientation),
    )
    .unwrap();
    (instrument, sink)
}

fn gap(settings: &SlitSettings, slit: &str) -> f64 {
    match settings[&SlitId::new(slit)] {
        SlitValue::Gap(v) => v,
        SlitValue::Blades(..) => panic!("expected a gap for {slit}"),
    }
}

fn reference() -> SlitSettings {
    settings([("S1", 2.0), ("S2", 0.5), ("S3", 3.0)])
}

#[test]
fn generic_beamline_scales_then_clamps() {
    let (generic, sink) = instrument("LOQ", InstrumentSettings::default(), Orientation::Horizontal);
    assert_eq!(generic.name(), GENERIC_BEAMLINE);

    let mut run = RunAngle::new(
        generic,
        Sample::new("Block 1"),
        SlitConfiguration::scaled(reference(), 0.3),
    )
    .unwrap();

    let record = run.run_angle(0.6, 10.0).unwrap();
    assert!((gap(&record.collimation, "S1") - 4.0).abs() < 1e-9);
    assert!(record.warnings.is_empty());

    let record = run.run_angle(3.0, 10.0).unwrap();
    assert_eq!(gap(&record.collimation, "S1"), 10.0);
    assert!(record.warnings.iter().any(|w| w.slit.as_str() == "S1" && w.applied == 10.0));
    assert_eq!(sink.last_value("S1VG"), Some(10.0));
    assert_eq!(run.history().len(), 2);
}

#[test]
fn polarized_mode_uses_its_own_maximum() {
    let settings = InstrumentSettings::default().with_mode(PolarizationMode::Pnr);
    let (polref, _) = instrument("POLREF", settings, Orientation::Horizontal);

    let mut run = RunAngle::polarized(
        polref,
        Sample::default(),
        SlitConfiguration::scaled(reference(), 0.3),
        PolarizationFrames::new(2, 2),
    )
    .unwrap();
    run.refl_init().unwrap();

    let record = run.run_angle(3.0, 10.0).unwrap();
    assert_eq!(gap(&record.collimation, "S1"), 8.0);
    assert_eq!(gap(&record.collimation, "S2"), 5.0);
}

#[test]
fn same_settings_land_on_swapped_axes() {
    let col = reference();

    let (horizontal, sink_h) =
        instrument("POLREF", InstrumentSettings::default(), Orientation::Horizontal);
    RunAngle::new(horizontal, Sample::default(), SlitConfiguration::fixed(col.clone()))
        .unwrap()
        .run_angle(0.5, 1.0)
        .unwrap();

    let (vertical, sink_v) =
        instrument("POLREF", InstrumentSettings::default(), Orientation::Vertical);
    RunAngle::new(vertical, Sample::default(), SlitConfiguration::fixed(col))
        .unwrap()
        .run_angle(0.5, 1.0)
        .unwrap();

    assert_eq!(sink_h.control_points(), vec!["S1VG", "S2VG", "S3VG"]);
    assert_eq!(sink_v.control_points(), vec!["S1HG", "S2HG", "S3HG"]);
    let values = |sink: &RecordingSink| {
        sink.writes()
            .into_iter()
            .map(|(_, v)| v)
            .collect::<Vec<_>>()
    };
    assert_eq!(values(&sink_h), values(&sink_v));
}

#[test]
fn vertical_mode_clamps_to_zero_minimum() {
    let (vertical, _) = instrument("POLREF", InstrumentSettings::default(), Orientation::Vertical);
    let mut run = RunAngle::new(
        vertical,
        Sample::default(),
        SlitConfiguration::scaled(reference(), 0.3),
    )
    .unwrap();
    let record = run.run_angle(0.0, 1.0).unwrap();
    assert_eq!(gap(&record.collimation, "S1"), 0.0);
    assert!(record.warnings.is_empty());
}

#[test]
fn refl_init_writes_flipper_before_frames() {
    let (polref, sink) =
        instrument("POLREF", InstrumentSettings::default(), Orientation::Horizontal);
    let mut run = RunAngle::polarized(
        polref,
        Sample::default(),
        SlitConfiguration::default(),
        PolarizationFrames::new(3, 4),
    )
    .unwrap();
    run.refl_init().unwrap();

    let points = sink.control_points();
    let position = |name: &str| points.iter().position(|p| p == name).unwrap();
    assert!(position(FLIPPER_STATE) < position(UP_FRAMES));
    assert!(position(FLIPPER_STATE) < position(DOWN_FRAMES));
    assert!(position(POLARISER_AMP) < position(FLIPPER_STATE));
    assert_eq!(sink.last_value(UP_FRAMES), Some(3.0));
    assert_eq!(sink.last_value(DOWN_FRAMES), Some(4.0));
}

#[test]
fn refl_init_on_unpolarized_instrument_writes_nothing() {
    let (inter, sink) = instrument("INTER", InstrumentSettings::default(), Orientation::Horizontal);
    let mut run = RunAngle::new(inter, Sample::default(), SlitConfiguration::default()).unwrap();

    let err = run.refl_init().unwrap_err();
    assert!(matches!(err, ReflError::UnsupportedCapability { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(sink.writes().is_empty());
}

#[test]
fn dry_run_reports_without_writing() {
    let settings = InstrumentSettings::default().with_dry_run(true);
    let (inter, sink) = instrument("INTER", settings, Orientation::Horizontal);
    let mut run = RunAngle::new(
        inter,
        Sample::new("Block 1").with_subtitle("D2O"),
        SlitConfiguration::scaled(reference(), 0.3).with_width_slits(settings_width()),
    )
    .unwrap();

    run.transmission(None, Some(20.0)).unwrap();
    run.run_angle(0.6, 30.0).unwrap();

    assert!(sink.writes().is_empty());
    let journal = run.instrument().journal();
    assert_eq!(journal.len(), 2 * (3 + 2));
    assert!(journal.iter().all(|record| record.dry_run));

    let report = run.history_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(parsed[0]["kind"], "transmission");
    assert_eq!(parsed[1]["kind"], "reflection");
    assert_eq!(parsed[1]["sample"], "Block 1 D2O");
    assert_eq!(parsed[1]["dry_run"], true);
}

fn settings_width() -> SlitSettings {
    settings([("S1", 40.0), ("S2", 30.0)])
}

#[test]
fn hardware_failure_stops_the_run() {
    let sink = RecordingSink::failing_on("S2VG");
    let inter = Instrument::init(
        &InstrumentSettings::for_beamline("INTER"),
        Box::new(sink.clone()),
        &FixedIdentity::new("INTER"),
        &FixedOrientation(Orientation::Horizontal),
    )
    .unwrap();
    let mut run = RunAngle::new(
        inter,
        Sample::default(),
        SlitConfiguration::fixed(reference()),
    )
    .unwrap();

    let err = run.run_angle(0.5, 1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Hardware);
    assert_eq!(run.state(), SequencerState::Configured);
    assert!(run.history().is_empty());
}

#[test]
fn sequencer_hands_back_its_instrument() {
    let (inter, _) = instrument("INTER", InstrumentSettings::default(), Orientation::Horizontal);
    let mut run = RunAngle::new(inter, Sample::default(), SlitConfiguration::default()).unwrap();
    let record = run.transmission(None, None).unwrap();
    assert_eq!(record.kind, RunKind::Transmission);

    let inter = run.into_instrument();
    assert_eq!(inter.journal().len(), 4);
    // A new session can reuse it.
    RunAngle::new(inter, Sample::default(), SlitConfiguration::default()).unwrap();
}
