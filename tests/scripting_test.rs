use refl_control::hardware::mock::{FixedOrientation, RecordingSink, UnavailableIdentity};
use refl_control::instrument::{Instrument, InstrumentSettings, PolarizationFrames};
use refl_control::limits::Orientation;
use refl_control::sample::Sample;
use refl_control::scripting::ScriptHost;
use refl_control::sequencer::{RunAngle, SlitConfiguration};
use refl_control::slit::settings;

fn host(beamline: &str, dry_run: bool) -> (ScriptHost, RecordingSink) {
    let sink = RecordingSink::new();
    let instrument = Instrument::init(
        &InstrumentSettings::for_beamline(beamline).with_dry_run(dry_run),
        Box::new(sink.clone()),
        &UnavailableIdentity,
        &FixedOrientation(Orientation::Horizontal),
    )
    .unwrap();
    let slits = SlitConfiguration::scaled(settings([("S1", 0.5), ("S2", 0.25)]), 0.5);
    let run = RunAngle::new(instrument, Sample::new("Block 1"), slits).unwrap();
    (ScriptHost::new(run), sink)
}

#[test]
fn test_simple_script() {
    let (host, _) = host("INTER", true);
    let result = host.run_script("5 + 5").unwrap();
    assert_eq!(result.as_int().unwrap(), 10);
}

#[test]
fn test_safety_limit() {
    let (host, _) = host("INTER", true);
    let result = host.run_script("loop { }");

    assert!(result.is_err());
    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("Script terminated") || err_msg.contains("Safety limit exceeded"));
}

#[test]
fn test_script_validation() {
    let (host, _) = host("INTER", true);
    assert!(host.validate_script("session.run_angle(0.5, 10);").is_ok());
    assert!(host.validate_script("let x = ;").is_err());
}

#[test]
fn script_drives_the_session() {
    let (host, sink) = host("INTER", false);
    let warnings = host
        .run_script(
            r#"
            session.transmission();
            let total = 0;
            for angle in [1.0, 2] {
                let run = session.run_angle(angle, 30);
                total += run.warnings.len();
            }
            total
            "#,
        )
        .unwrap();

    assert_eq!(warnings.as_int().unwrap(), 0);
    assert_eq!(sink.last_value("S1VG"), Some(2.0));
    assert_eq!(sink.writes().len(), 6);

    let run = host.into_run_angle().unwrap();
    assert_eq!(run.history().len(), 3);
}

#[test]
fn dry_run_script_check_report() {
    let (host, sink) = host("INTER", true);
    host.run_script("session.transmission(1.0, 20); session.run_angle(100, 5);")
        .unwrap();
    assert!(sink.writes().is_empty());

    let report: serde_json::Value = serde_json::from_str(&host.history_json().unwrap()).unwrap();
    assert_eq!(report.as_array().unwrap().len(), 2);
    // S1 at 100 degrees is far beyond the NR maximum.
    assert!(!report[1]["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn errors_surface_in_the_script() {
    let (host, sink) = host("INTER", false);
    let err = host.run_script("session.refl_init()").unwrap_err();
    assert!(err.to_string().contains("does not support"));

    assert!(host.run_script(r#"session.run_angle("steep", 5)"#).is_err());
    assert!(sink.writes().is_empty());
}

#[test]
fn polarized_script_must_initialise_first() {
    let sink = RecordingSink::new();
    let instrument = Instrument::init(
        &InstrumentSettings::for_beamline("CRISP"),
        Box::new(sink.clone()),
        &UnavailableIdentity,
        &FixedOrientation(Orientation::Horizontal),
    )
    .unwrap();
    let run = RunAngle::polarized(
        instrument,
        Sample::default(),
        SlitConfiguration::default(),
        PolarizationFrames::new(1, 2),
    )
    .unwrap();
    let host = ScriptHost::new(run);

    assert!(host.run_script("session.run_angle(0.5, 10)").is_err());
    host.run_script("session.refl_init(); session.run_angle(0.5, 10);")
        .unwrap();
    let name = host.run_script("session.instrument").unwrap().into_string().unwrap();
    assert_eq!(name, "CRISP");
}
