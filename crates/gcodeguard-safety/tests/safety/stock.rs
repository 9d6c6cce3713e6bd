use gcodeguard_safety::StockModel;

#[test]
fn test_size_header() {
    let stock = StockModel::scan("(Stock: 300 x 200 x 18)\nG0 Z5\n");
    assert!(stock.defined);
    assert_eq!(stock.max_x, Some(300.0));
    assert_eq!(stock.max_y, Some(200.0));
    assert_eq!(stock.thickness, Some(18.0));
    assert_eq!(stock.top_z, 0.0);
    assert_eq!(stock.bottom_z, Some(-18.0));
}

#[test]
fn test_first_bound_wins() {
    let stock = StockModel::scan("(stock x max: 100)\n(stock x max: 200)\n");
    assert_eq!(stock.max_x, Some(100.0));
}

#[test]
fn test_last_thickness_wins() {
    let stock = StockModel::scan("; material thickness = 12\n; stock thickness: 15\n");
    assert_eq!(stock.thickness, Some(15.0));
    assert_eq!(stock.bottom_z, Some(-15.0));
}

#[test]
fn test_raised_top_surface() {
    let stock = StockModel::scan("(stock top: 2)\n(stock thickness: 10)\n");
    assert_eq!(stock.top_z, 2.0);
    assert_eq!(stock.bottom_z, Some(-8.0));
    assert!(stock.is_in_material(1.0));
    assert_eq!(stock.depth_at(-1.0), 3.0);
}

#[test]
fn test_material_hint() {
    let stock = StockModel::scan("; Material: Hard Wood\nG21\n");
    assert!(stock.defined);
    assert_eq!(stock.material.as_deref(), Some("Hard Wood"));
}

#[test]
fn test_no_hints() {
    let stock = StockModel::scan("G21\nG0 Z5\nG1 X10 F100\n");
    assert_eq!(stock, StockModel::default());
}
