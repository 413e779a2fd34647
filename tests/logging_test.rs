use refl_control::config::LoggingConfig;
use refl_control::logging::init_tracing;

#[test]
fn subscriber_installs_once() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        json: true,
    };
    init_tracing(&config).unwrap();
    tracing::info!("subscriber installed");

    assert!(init_tracing(&LoggingConfig::default()).is_err());
}
