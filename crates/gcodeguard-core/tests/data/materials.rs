use gcodeguard_core::data::materials::*;

#[test]
fn test_material_id_normalization() {
    assert_eq!(MaterialId::normalized("Hardwood").0, "hardwood");
    assert_eq!(MaterialId::normalized("  Hard - Wood ").0, "hard_wood");
    assert_eq!(MaterialId::normalized("Aluminum 6061").0, "aluminum_6061");
    assert_eq!(MaterialId::normalized("   ").0, "unknown");
    assert_eq!(MaterialId::from("MDF"), MaterialId::normalized("mdf"));
}

#[test]
fn test_material_category_classification() {
    assert_eq!(MaterialId::from("hardwood").category(), MaterialCategory::Wood);
    assert_eq!(MaterialId::from("Red Oak").category(), MaterialCategory::Wood);
    assert_eq!(MaterialId::from("acrylic").category(), MaterialCategory::Plastic);
    assert_eq!(
        MaterialId::from("Aluminum 6061").category(),
        MaterialCategory::NonFerrousMetal
    );
    assert_eq!(
        MaterialId::from("carbon steel").category(),
        MaterialCategory::FerrousMetal
    );
    assert_eq!(
        MaterialId::from("carbon fiber").category(),
        MaterialCategory::Composite
    );
    assert_eq!(MaterialId::from("cheese").category(), MaterialCategory::Unknown);
}

#[test]
fn test_chip_load_range_scales_with_diameter() {
    let (min3, max3) = MaterialCategory::Wood.chip_load_range(3.0);
    let (min6, max6) = MaterialCategory::Wood.chip_load_range(6.0);
    assert!(min3 < max3);
    assert!((max6 - 2.0 * max3).abs() < 1e-12);
    assert!((min6 - 2.0 * min3).abs() < 1e-12);
}
