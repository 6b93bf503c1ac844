use super::*;

#[test]
fn camel_case_json_with_defaults() {
    let cfg = FluidConfig::from_json_str(
        r#"{ "simWidth": 64, "simHeight": 32, "velocityDissipation": 0.98, "enableVorticity": true }"#,
    )
    .unwrap();
    assert_eq!((cfg.sim_width, cfg.sim_height), (64, 32));
    assert_eq!(cfg.velocity_dissipation, 0.98);
    assert!(cfg.enable_vorticity);
    assert!(!FluidConfig::default().enable_vorticity);
    assert_eq!(cfg.pressure_iterations, 20);
    assert_eq!(cfg.force_strength, 6000.0);

    let json = serde_json::to_value(&cfg).unwrap();
    assert!(json.get("dyeDissipation").is_some());
    assert!(json.get("dye_dissipation").is_none());
}

#[test]
fn malformed_json_is_a_serde_error() {
    assert!(matches!(
        FluidConfig::from_json_str("{ simWidth: }"),
        Err(FluxError::Serde(_))
    ));
    assert!(matches!(
        FluidConfig::from_json_file("/definitely/not/here.json"),
        Err(FluxError::Serde(_))
    ));
}

#[test]
fn degenerate_values_are_clamped() {
    let cfg = FluidConfig {
        sim_width: 0,
        sim_height: 0,
        pressure_iterations: 0,
        pressure: 3.0,
        velocity_dissipation: -1.0,
        dye_dissipation: f32::NAN,
        force_strength: f32::INFINITY,
        time_step: 0.0,
        enable_vorticity: true,
        vorticity_strength: -5.0,
        splat_radius: 0.0,
    }
    .sanitized();
    assert_eq!((cfg.sim_width, cfg.sim_height), (1, 1));
    assert_eq!(cfg.pressure_iterations, 1);
    assert_eq!(cfg.pressure, 1.0);
    assert_eq!(cfg.velocity_dissipation, 0.0);
    assert_eq!(cfg.dye_dissipation, 0.0);
    assert_eq!(cfg.force_strength, 0.0);
    assert_eq!(cfg.time_step, MIN_TIME_STEP);
    assert_eq!(cfg.vorticity_strength, 0.0);
    assert_eq!(cfg.splat_radius, MIN_SPLAT_RADIUS);
}

#[test]
fn patches_overlay_and_reject_grid_size() {
    let mut cfg = FluidConfig::default();
    let patch = FluidConfigPatch::from_json_str(r#"{ "pressureIterations": 0, "pressure": 0.5 }"#)
        .unwrap();
    assert!(patch.touches_pressure());
    assert!(!patch.touches_decay());
    cfg.apply(&patch);
    assert_eq!(cfg.pressure_iterations, 1);
    assert_eq!(cfg.pressure, 0.5);
    assert_eq!(cfg.sim_width, 128);

    assert!(matches!(
        FluidConfigPatch::from_json_str(r#"{ "simWidth": 10 }"#),
        Err(FluxError::Serde(_))
    ));
}
