use gcodeguard_gcode::{parse, FirstMatchTokenizer, LineTokenizer};

#[test]
fn test_parse_basic_move() {
    let line = parse("G1 X10.5 Y-3 Z-1.25 F800");
    assert_eq!(line.g, Some(1.0));
    assert_eq!(line.x, Some(10.5));
    assert_eq!(line.y, Some(-3.0));
    assert_eq!(line.z, Some(-1.25));
    assert_eq!(line.f, Some(800.0));
    assert_eq!(line.m, None);
    assert_eq!(line.words.len(), 5);
}

#[test]
fn test_parse_is_case_insensitive_and_compact() {
    let line = parse("g0x1y2z3");
    assert_eq!(line.g, Some(0.0));
    assert_eq!(line.x, Some(1.0));
    assert_eq!(line.y, Some(2.0));
    assert_eq!(line.z, Some(3.0));
}

#[test]
fn test_first_occurrence_wins() {
    let line = parse("G0 G90 X5 X7");
    assert_eq!(line.g, Some(0.0));
    assert_eq!(line.x, Some(5.0));
    // The full word list keeps both G words
    assert_eq!(line.words.iter().filter(|w| w.letter == 'G').count(), 2);
}

#[test]
fn test_malformed_number_is_absent() {
    let line = parse("G1 X- Y4");
    assert_eq!(line.x, None);
    assert_eq!(line.y, Some(4.0));
    assert_eq!(line.words[1].text, "-");
    assert_eq!(line.words[1].value, None);
}

#[test]
fn test_comments_are_stripped() {
    let line = parse("G1 X10 ; Z-5 is not here");
    assert_eq!(line.z, None);
    assert_eq!(line.code, "G1 X10");
    assert_eq!(line.comment.as_deref(), Some("Z-5 is not here"));

    let line = parse("(Stock: 100 x 50 x 12)");
    assert!(line.is_empty());
    assert_eq!(line.comment.as_deref(), Some("Stock: 100 x 50 x 12"));
}

#[test]
fn test_blank_line() {
    let line = parse("   ");
    assert!(line.is_empty());
    assert_eq!(line.raw, "   ");
    assert!(!line.has_axis());
}

#[test]
fn test_leading_decimal_and_sign() {
    let line = parse("G1 Z-.5 F+300");
    assert_eq!(line.z, Some(-0.5));
    assert_eq!(line.f, Some(300.0));
}

#[test]
fn test_untracked_letters_kept_as_words() {
    let line = parse("N10 G1 X1 A45");
    assert_eq!(line.words.len(), 4);
    assert_eq!(line.words[0].letter, 'N');
    assert_eq!(line.field('A'), None);
}

#[test]
fn test_tokenizer_trait_object() {
    let tokenizer: Box<dyn LineTokenizer> = Box::new(FirstMatchTokenizer::new());
    assert_eq!(tokenizer.name(), "first_match");
    assert_eq!(tokenizer.parse("M3 S12000").s, Some(12000.0));
}
