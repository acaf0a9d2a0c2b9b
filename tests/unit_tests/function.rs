use matrixcompare::assert_matrix_eq;
use nalgebra::{DVector, Matrix3, Point3, Vector3};
use polyxtal::function::{load_cells, load_nodal, tensor_from_components, FunctionInput, Interpolant};
use polyxtal::input::FunctionRecord;
use polyxtal::Error;

fn points() -> Vec<Point3<f64>> {
    vec![
        Point3::origin(),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.5, 2.0, -1.0),
    ]
}

#[test]
fn constant_function_loads_onto_every_node() {
    let function = FunctionInput::constant(&[1.0, 2.0, 3.0]);
    let field = load_nodal(&function, &points(), 3).unwrap();
    assert_eq!(field.num_nodes(), 3);
    assert_eq!(field.num_components(), 3);
    for node in 0..3 {
        assert_eq!(field.node_value(node), &[1.0, 2.0, 3.0]);
    }
}

#[test]
fn linear_interpolant_is_exact_at_nodes() {
    let a = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
    let b = Vector3::new(0.1, 0.2, 0.3);
    let function = FunctionInput::Interpolation(Interpolant::linear(a, Some(b)));
    let field = load_nodal(&function, &points(), 3).unwrap();
    for (node, x) in points().iter().enumerate() {
        let expected = a * x.coords + b;
        assert_matrix_eq!(field.node_vector3(node), expected, comp = abs, tol = 1e-14);
    }
}

#[test]
fn loading_checks_the_number_of_components() {
    let function = FunctionInput::constant(&[1.0, 2.0]);
    assert!(matches!(load_nodal(&function, &points(), 3), Err(Error::InvalidInput(_))));
    assert!(matches!(load_cells(&function, &points(), 1), Err(Error::InvalidInput(_))));

    let lying = FunctionInput::Interpolation(Interpolant::new(2, |_| DVector::zeros(3)));
    assert!(matches!(load_nodal(&lying, &points(), 2), Err(Error::InvalidInput(_))));
}

#[test]
fn xdmf_functions_are_not_loadable() {
    let function = FunctionInput::Xdmf {
        file: "fields.xdmf".into(),
        name: "beta".to_string(),
    };
    assert_eq!(function.num_components(), None);
    assert!(matches!(load_cells(&function, &points(), 9), Err(Error::NotImplemented(_))));
}

#[test]
fn tensor_components_are_row_major() {
    let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
    let function = FunctionInput::constant_tensor(&m);
    let value = function.evaluate(&Point3::origin()).unwrap();
    assert_eq!(value.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    assert_eq!(tensor_from_components(&value).unwrap(), m);
    assert!(tensor_from_components(&DVector::zeros(6)).is_err());
}

#[test]
fn function_record_requires_source_specific_fields() {
    let constant = FunctionRecord::new("constant").with_value(vec![4.0]).build().unwrap();
    assert_eq!(constant.num_components(), Some(1));

    assert!(matches!(
        FunctionRecord::new("constant").build(),
        Err(Error::MissingField { field: "value", .. })
    ));
    assert!(matches!(
        FunctionRecord::new("interpolation").build(),
        Err(Error::MissingField { field: "function", .. })
    ));
    assert!(matches!(
        FunctionRecord::new("xdmf").with_file("u.xdmf").build(),
        Err(Error::MissingField { field: "name", .. })
    ));
    assert!(matches!(
        FunctionRecord::new("xdmf").with_name("u").build(),
        Err(Error::MissingField { field: "file", .. })
    ));
    assert!(matches!(FunctionRecord::new("python").build(), Err(Error::InvalidInput(_))));

    let xdmf = FunctionRecord::new("xdmf")
        .with_file("u.xdmf")
        .with_name("u")
        .build()
        .unwrap();
    assert!(matches!(xdmf, FunctionInput::Xdmf { .. }));
}
