use gcodeguard_core::data::tools::*;

#[test]
fn test_tool_type_parse_aliases() {
    assert_eq!("endmill".parse::<ToolType>(), Ok(ToolType::EndMill));
    assert_eq!("End Mill".parse::<ToolType>(), Ok(ToolType::EndMill));
    assert_eq!("ball-nose".parse::<ToolType>(), Ok(ToolType::BallNose));
    assert_eq!("V-Bit".parse::<ToolType>(), Ok(ToolType::VBit));
    assert!("spoon".parse::<ToolType>().is_err());
}

#[test]
fn test_tool_type_key_names_are_unique() {
    let mut names: Vec<&str> = ToolType::all().iter().map(|t| t.key_name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), ToolType::all().len());
}

#[test]
fn test_chip_load_requires_geometry() {
    let bare = ToolDescriptor::new(ToolType::EndMill).with_diameter(6.0);
    assert_eq!(bare.chip_load(2000.0, 10000.0), None);

    let tool = bare.with_flutes(2);
    let chip_load = tool.chip_load(2000.0, 10000.0).unwrap();
    assert!((chip_load - 0.1).abs() < 1e-9);
    assert_eq!(tool.chip_load(2000.0, 0.0), None);
}

#[test]
fn test_tool_table_resolution() {
    let mut table = ToolTable::new();
    assert!(table.is_empty());
    assert!(table.resolve(Some(1)).is_none());

    let fallback = ToolDescriptor::new(ToolType::VBit);
    table.set_fallback(Some(fallback.clone()));
    assert_eq!(table.resolve(None), Some(&fallback));

    let endmill = ToolDescriptor::new(ToolType::EndMill).with_diameter(3.175);
    table.add_tool(2, endmill.clone());
    assert_eq!(table.len(), 1);
    assert_eq!(table.resolve(Some(2)), Some(&endmill));
    // Unknown numbers fall back rather than disabling the lookup
    assert_eq!(table.resolve(Some(9)), Some(&fallback));
}

#[test]
fn test_description_short() {
    let tool = ToolDescriptor::new(ToolType::EndMill)
        .with_diameter(6.0)
        .with_flutes(2);
    assert_eq!(tool.description_short(), "Flat End Mill 6mm, 2 flutes");
    assert_eq!(ToolDescriptor::new(ToolType::Drill).description_short(), "Drill Bit");
}
