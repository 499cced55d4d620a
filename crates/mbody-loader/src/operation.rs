//! Expression trees for definition values
//!
//! Masses, inertias, offsets and rotations in definition files are written
//! as small expression trees that are resolved against a parameter set when
//! a system is instantiated:
//!
//! ```xml
//! <Multiply>
//!   <Parameter name="length"/>
//!   <Number>0.5</Number>
//! </Multiply>
//! ```
//!
//! | node | children | value |
//! |------|----------|-------|
//! | `Number` | text | literal |
//! | `Zero` | none | 0 |
//! | `Parameter name=".."` | none | named parameter |
//! | `Sin`, `Cos`, `Rad2Deg`, `Deg2Rad` | 1 | function of child |
//! | `Add`, `Subtract`, `Multiply`, `Divide` | ≥ 2 | left fold |
//! | `Vector` | 3 scalars | 3-vector |
//! | `Matrix` | 3 `Row`s of 3 scalars | 3×3 matrix |
//! | `Identity` | none | 3×3 identity |

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::parameter::ParameterLookup;
use crate::xml::XmlNode;

/// A value that can be computed from a parameter set
pub trait Operation {
    type Output;

    fn resolve(&self, parameters: &dyn ParameterLookup) -> Result<Self::Output>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarOperation {
    Number(f64),
    Zero,
    Parameter(String),
    Sin(Box<ScalarOperation>),
    Cos(Box<ScalarOperation>),
    Rad2Deg(Box<ScalarOperation>),
    Deg2Rad(Box<ScalarOperation>),
    Add(Vec<ScalarOperation>),
    Subtract(Vec<ScalarOperation>),
    Multiply(Vec<ScalarOperation>),
    Divide(Vec<ScalarOperation>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorOperation {
    Parameter(String),
    Vector(Box<[ScalarOperation; 3]>),
    Zero,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatrixOperation {
    Parameter(String),
    Matrix(Box<[[ScalarOperation; 3]; 3]>),
    Identity,
}

impl From<f64> for ScalarOperation {
    fn from(value: f64) -> Self {
        ScalarOperation::Number(value)
    }
}

impl VectorOperation {
    pub fn constant(v: Vector3<f64>) -> Self {
        VectorOperation::Vector(Box::new([v.x.into(), v.y.into(), v.z.into()]))
    }
}

impl MatrixOperation {
    pub fn constant(m: Matrix3<f64>) -> Self {
        let row = |i: usize| [m[(i, 0)].into(), m[(i, 1)].into(), m[(i, 2)].into()];
        MatrixOperation::Matrix(Box::new([row(0), row(1), row(2)]))
    }
}

fn fold(
    operands: &[ScalarOperation],
    parameters: &dyn ParameterLookup,
    op: impl Fn(f64, f64) -> f64,
) -> Result<f64> {
    let mut values = operands.iter().map(|operand| operand.resolve(parameters));
    let first = values.next().unwrap_or(Ok(0.0))?;
    values.try_fold(first, |acc, value| Ok(op(acc, value?)))
}

impl Operation for ScalarOperation {
    type Output = f64;

    fn resolve(&self, parameters: &dyn ParameterLookup) -> Result<f64> {
        match self {
            ScalarOperation::Number(value) => Ok(*value),
            ScalarOperation::Zero => Ok(0.0),
            ScalarOperation::Parameter(name) => parameters
                .scalar(name)
                .ok_or_else(|| LoadError::parameter_not_found("scalar", name.as_str())),
            ScalarOperation::Sin(operand) => Ok(operand.resolve(parameters)?.sin()),
            ScalarOperation::Cos(operand) => Ok(operand.resolve(parameters)?.cos()),
            ScalarOperation::Rad2Deg(operand) => Ok(operand.resolve(parameters)?.to_degrees()),
            ScalarOperation::Deg2Rad(operand) => Ok(operand.resolve(parameters)?.to_radians()),
            ScalarOperation::Add(operands) => fold(operands, parameters, |a, b| a + b),
            ScalarOperation::Subtract(operands) => fold(operands, parameters, |a, b| a - b),
            ScalarOperation::Multiply(operands) => fold(operands, parameters, |a, b| a * b),
            ScalarOperation::Divide(operands) => fold(operands, parameters, |a, b| a / b),
        }
    }
}

impl Operation for VectorOperation {
    type Output = Vector3<f64>;

    fn resolve(&self, parameters: &dyn ParameterLookup) -> Result<Vector3<f64>> {
        match self {
            VectorOperation::Parameter(name) => parameters
                .vector(name)
                .ok_or_else(|| LoadError::parameter_not_found("vector", name.as_str())),
            VectorOperation::Vector(entries) => Ok(Vector3::new(
                entries[0].resolve(parameters)?,
                entries[1].resolve(parameters)?,
                entries[2].resolve(parameters)?,
            )),
            VectorOperation::Zero => Ok(Vector3::zeros()),
        }
    }
}

impl Operation for MatrixOperation {
    type Output = Matrix3<f64>;

    fn resolve(&self, parameters: &dyn ParameterLookup) -> Result<Matrix3<f64>> {
        match self {
            MatrixOperation::Parameter(name) => parameters
                .matrix(name)
                .ok_or_else(|| LoadError::parameter_not_found("matrix", name.as_str())),
            MatrixOperation::Matrix(rows) => {
                let mut m = Matrix3::zeros();
                for (i, row) in rows.iter().enumerate() {
                    for (j, entry) in row.iter().enumerate() {
                        m[(i, j)] = entry.resolve(parameters)?;
                    }
                }
                Ok(m)
            }
            MatrixOperation::Identity => Ok(Matrix3::identity()),
        }
    }
}

fn parameter_name(node: &XmlNode) -> Result<String> {
    Ok(node.required_attribute("name")?.to_string())
}

fn unary(node: &XmlNode) -> Result<Box<ScalarOperation>> {
    Ok(Box::new(parse_scalar(node.only_child()?)?))
}

fn operands(node: &XmlNode) -> Result<Vec<ScalarOperation>> {
    if node.children.len() < 2 {
        return Err(LoadError::bad_definition(
            format!("<{}>", node.name),
            format!("expected at least two operands, found {}", node.children.len()),
        ));
    }
    node.children.iter().map(parse_scalar).collect()
}

fn triple(node: &XmlNode) -> Result<[ScalarOperation; 3]> {
    match node.children.as_slice() {
        [a, b, c] => Ok([parse_scalar(a)?, parse_scalar(b)?, parse_scalar(c)?]),
        children => Err(LoadError::bad_definition(
            format!("<{}>", node.name),
            format!("expected three entries, found {}", children.len()),
        )),
    }
}

/// Parse a scalar operation node
pub fn parse_scalar(node: &XmlNode) -> Result<ScalarOperation> {
    let name = node.name.to_ascii_lowercase();
    match name.as_str() {
        "number" => node
            .text()
            .parse::<f64>()
            .map(ScalarOperation::Number)
            .map_err(|_| LoadError::bad_definition("<Number>", format!("'{}' is not a number", node.text()))),
        "zero" => Ok(ScalarOperation::Zero),
        "parameter" => Ok(ScalarOperation::Parameter(parameter_name(node)?)),
        "sin" => Ok(ScalarOperation::Sin(unary(node)?)),
        "cos" => Ok(ScalarOperation::Cos(unary(node)?)),
        "rad2deg" => Ok(ScalarOperation::Rad2Deg(unary(node)?)),
        "deg2rad" => Ok(ScalarOperation::Deg2Rad(unary(node)?)),
        "add" => Ok(ScalarOperation::Add(operands(node)?)),
        "subtract" => Ok(ScalarOperation::Subtract(operands(node)?)),
        "multiply" => Ok(ScalarOperation::Multiply(operands(node)?)),
        "divide" => Ok(ScalarOperation::Divide(operands(node)?)),
        _ => Err(LoadError::bad_definition(
            format!("<{}>", node.name),
            "not a scalar operation",
        )),
    }
}

/// Parse a vector operation node
pub fn parse_vector(node: &XmlNode) -> Result<VectorOperation> {
    let name = node.name.to_ascii_lowercase();
    match name.as_str() {
        "parameter" => Ok(VectorOperation::Parameter(parameter_name(node)?)),
        "vector" => Ok(VectorOperation::Vector(Box::new(triple(node)?))),
        "zero" => Ok(VectorOperation::Zero),
        _ => Err(LoadError::bad_definition(
            format!("<{}>", node.name),
            "not a vector operation",
        )),
    }
}

/// Parse a matrix operation node
pub fn parse_matrix(node: &XmlNode) -> Result<MatrixOperation> {
    let name = node.name.to_ascii_lowercase();
    match name.as_str() {
        "parameter" => Ok(MatrixOperation::Parameter(parameter_name(node)?)),
        "identity" => Ok(MatrixOperation::Identity),
        "matrix" => {
            let rows: Vec<&XmlNode> = node.children.iter().collect();
            if rows.len() != 3 || rows.iter().any(|row| !row.is("row")) {
                return Err(LoadError::bad_definition(
                    "<Matrix>",
                    "expected three <Row> children",
                ));
            }
            Ok(MatrixOperation::Matrix(Box::new([
                triple(rows[0])?,
                triple(rows[1])?,
                triple(rows[2])?,
            ])))
        }
        _ => Err(LoadError::bad_definition(
            format!("<{}>", node.name),
            "not a matrix operation",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameters;
    use crate::xml::parse_document;
    use approx::assert_relative_eq;

    fn scalar(xml: &str) -> Result<f64> {
        let params = Parameters::new().with_scalar("length", 2.0);
        parse_scalar(&parse_document(xml)?)?.resolve(&params)
    }

    #[test]
    fn test_scalar_operations() {
        assert_relative_eq!(scalar("<Number>1.5</Number>").unwrap(), 1.5);
        assert_relative_eq!(scalar("<Zero/>").unwrap(), 0.0);
        assert_relative_eq!(scalar(r#"<Parameter name="Length"/>"#).unwrap(), 2.0);
        assert_relative_eq!(
            scalar("<Subtract><Number>10</Number><Number>3</Number><Number>2</Number></Subtract>").unwrap(),
            5.0
        );
        assert_relative_eq!(
            scalar("<Divide><Number>12</Number><Number>3</Number><Number>2</Number></Divide>").unwrap(),
            2.0
        );
        assert_relative_eq!(
            scalar(r#"<Multiply><Parameter name="length"/><Number>0.25</Number></Multiply>"#).unwrap(),
            0.5
        );
        assert_relative_eq!(
            scalar("<Sin><Deg2Rad><Number>90</Number></Deg2Rad></Sin>").unwrap(),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            scalar("<Rad2Deg><Cos><Zero/></Cos></Rad2Deg>").unwrap(),
            1.0_f64.to_degrees(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_scalar_arity_errors() {
        assert!(matches!(scalar("<Add><Number>1</Number></Add>"), Err(LoadError::BadDefinition { .. })));
        assert!(matches!(scalar("<Sin/>"), Err(LoadError::BadDefinition { .. })));
        assert!(matches!(scalar("<Number>abc</Number>"), Err(LoadError::BadDefinition { .. })));
        assert!(matches!(scalar("<Vector/>"), Err(LoadError::BadDefinition { .. })));
    }

    #[test]
    fn test_missing_parameter() {
        let err = scalar(r#"<Parameter name="width"/>"#).unwrap_err();
        assert!(matches!(err, LoadError::ParameterNotFound { kind: "scalar", .. }));
    }

    #[test]
    fn test_vector_and_matrix_operations() {
        let params = Parameters::new()
            .with_scalar("l", 3.0)
            .with_vector("axis", Vector3::z());

        let node = parse_document(r#"<Vector><Number>1</Number><Parameter name="l"/><Zero/></Vector>"#).unwrap();
        assert_relative_eq!(parse_vector(&node).unwrap().resolve(&params).unwrap(), Vector3::new(1.0, 3.0, 0.0));

        let node = parse_document(r#"<Parameter name="axis"/>"#).unwrap();
        assert_relative_eq!(parse_vector(&node).unwrap().resolve(&params).unwrap(), Vector3::z());

        let node = parse_document(
            "<Matrix>
                <Row><Number>1</Number><Zero/><Zero/></Row>
                <Row><Zero/><Number>2</Number><Zero/></Row>
                <Row><Zero/><Zero/><Parameter name=\"l\"/></Row>
            </Matrix>",
        )
        .unwrap();
        assert_relative_eq!(
            parse_matrix(&node).unwrap().resolve(&params).unwrap(),
            Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0))
        );

        let node = parse_document("<Vector><Number>1</Number><Number>2</Number></Vector>").unwrap();
        assert!(parse_vector(&node).is_err());
        let node = parse_document("<Matrix><Row><Zero/><Zero/><Zero/></Row></Matrix>").unwrap();
        assert!(parse_matrix(&node).is_err());
        let node = parse_document(r#"<Parameter name="missing"/>"#).unwrap();
        assert!(matches!(
            parse_matrix(&node).unwrap().resolve(&params),
            Err(LoadError::ParameterNotFound { kind: "matrix", .. })
        ));
    }

    #[test]
    fn test_constants_round_trip() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let params = Parameters::new();
        assert_eq!(MatrixOperation::constant(m).resolve(&params).unwrap(), m);
        assert_eq!(
            VectorOperation::constant(Vector3::new(1.0, -2.0, 0.5)).resolve(&params).unwrap(),
            Vector3::new(1.0, -2.0, 0.5)
        );
    }
}
