pub fn assert_fraction_near(actual: f64, expected: f64, relative: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= expected * relative,
        "expected {} ± {}%, got {}",
        expected,
        relative * 100.0,
        actual
    );
}
