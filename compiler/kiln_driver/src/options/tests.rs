use pretty_assertions::assert_eq;

use super::*;

#[test]
fn default_is_unmanaged_without_debug_info() {
    let options = CompileOptions::default();
    assert!(!options.managed);
    assert!(!options.debug_level.is_enabled());
    assert!(options.optimize);
    assert_eq!(options.pass_iteration_limit, DEFAULT_ITERATION_LIMIT);
    assert_eq!(options.lower_options(), LowerOptions::default());
}

#[test]
fn presets() {
    let development = CompileOptions::development();
    assert!(development.managed);
    assert_eq!(development.debug_level, DebugLevel::Full);
    assert!(!development.minified);

    let release = CompileOptions::release();
    assert!(!release.managed);
    assert_eq!(release.debug_level, DebugLevel::LinesOnly);
    assert!(release.minified && release.parallel);
}

#[test]
fn threshold_override_reaches_lowering() {
    let options = CompileOptions::default().with_switch_table_threshold(4);
    assert_eq!(options.lower_options().switch_table_threshold, 4);
}
