use gcodeguard_gcode::{format_value, parse, MachineState};
use proptest::prelude::*;

proptest! {
    #[test]
    fn parse_never_panics(line in "\\PC{0,80}") {
        let instruction = parse(&line);
        prop_assert_eq!(instruction.raw, line);
    }

    #[test]
    fn absolute_target_matches_word(x in -1000.0f64..1000.0, z in -100.0f64..100.0) {
        let state = MachineState::new(5.0);
        let line = parse(&format!("G1 X{} Z{}", format_value(x), format_value(z)));
        let target = state.target(&line);
        prop_assert!((target.x - x).abs() < 1e-3);
        prop_assert!((target.z - z).abs() < 1e-3);
    }
}
