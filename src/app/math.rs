use crate::domain::model::Element;
use crate::utils::error::{IrError, Result};
use std::fmt;

/// 逐元素二元運算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BinaryOperation {
    #[default]
    Add,
    Subtract,
    CoordinatewiseMultiply,
    CoordinatewiseDivide,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
}

impl BinaryOperation {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOperation::Add => "add",
            BinaryOperation::Subtract => "subtract",
            BinaryOperation::CoordinatewiseMultiply => "coordinatewise_multiply",
            BinaryOperation::CoordinatewiseDivide => "coordinatewise_divide",
            BinaryOperation::LogicalAnd => "logical_and",
            BinaryOperation::LogicalOr => "logical_or",
            BinaryOperation::LogicalXor => "logical_xor",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "add" => Ok(BinaryOperation::Add),
            "subtract" => Ok(BinaryOperation::Subtract),
            "coordinatewise_multiply" => Ok(BinaryOperation::CoordinatewiseMultiply),
            "coordinatewise_divide" => Ok(BinaryOperation::CoordinatewiseDivide),
            "logical_and" => Ok(BinaryOperation::LogicalAnd),
            "logical_or" => Ok(BinaryOperation::LogicalOr),
            "logical_xor" => Ok(BinaryOperation::LogicalXor),
            other => Err(IrError::UnknownType {
                type_name: format!("operation '{}'", other),
            }),
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            BinaryOperation::LogicalAnd | BinaryOperation::LogicalOr | BinaryOperation::LogicalXor
        )
    }
}

impl fmt::Display for BinaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element types the arithmetic nodes operate on.
pub trait Operand: Element {
    fn supports(op: BinaryOperation) -> bool;

    fn supports_dot() -> bool;

    fn apply(op: BinaryOperation, a: Self, b: Self) -> Result<Self>;

    /// 內積，依索引順序累加
    fn dot(a: &[Self], b: &[Self]) -> Result<Self>;
}

fn unsupported<T: Element>(op: &str) -> IrError {
    IrError::type_mismatch(format!("operand type supporting {}", op), T::PORT_TYPE.name())
}

fn check_lengths(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(IrError::dimension_mismatch("operands", a, b));
    }
    Ok(())
}

impl Operand for f64 {
    fn supports(op: BinaryOperation) -> bool {
        !op.is_logical()
    }

    fn supports_dot() -> bool {
        true
    }

    fn apply(op: BinaryOperation, a: Self, b: Self) -> Result<Self> {
        match op {
            BinaryOperation::Add => Ok(a + b),
            BinaryOperation::Subtract => Ok(a - b),
            BinaryOperation::CoordinatewiseMultiply => Ok(a * b),
            BinaryOperation::CoordinatewiseDivide => Ok(a / b),
            _ => Err(unsupported::<Self>(op.name())),
        }
    }

    fn dot(a: &[Self], b: &[Self]) -> Result<Self> {
        check_lengths(a.len(), b.len())?;
        let mut sum = 0.0;
        for (x, y) in a.iter().zip(b) {
            sum += x * y;
        }
        Ok(sum)
    }
}

impl Operand for i64 {
    fn supports(op: BinaryOperation) -> bool {
        !op.is_logical()
    }

    fn supports_dot() -> bool {
        true
    }

    fn apply(op: BinaryOperation, a: Self, b: Self) -> Result<Self> {
        let result = match op {
            BinaryOperation::Add => a.checked_add(b),
            BinaryOperation::Subtract => a.checked_sub(b),
            BinaryOperation::CoordinatewiseMultiply => a.checked_mul(b),
            BinaryOperation::CoordinatewiseDivide => {
                if b == 0 {
                    return Err(IrError::compute("integer division by zero"));
                }
                a.checked_div(b)
            }
            _ => return Err(unsupported::<Self>(op.name())),
        };
        result.ok_or_else(|| IrError::compute(format!("integer overflow in {} of {} and {}", op, a, b)))
    }

    fn dot(a: &[Self], b: &[Self]) -> Result<Self> {
        check_lengths(a.len(), b.len())?;
        let mut sum: i64 = 0;
        for (x, y) in a.iter().zip(b) {
            sum = x
                .checked_mul(*y)
                .and_then(|p| sum.checked_add(p))
                .ok_or_else(|| IrError::compute("integer overflow in dot product"))?;
        }
        Ok(sum)
    }
}

impl Operand for bool {
    fn supports(op: BinaryOperation) -> bool {
        op.is_logical()
    }

    fn supports_dot() -> bool {
        false
    }

    fn apply(op: BinaryOperation, a: Self, b: Self) -> Result<Self> {
        match op {
            BinaryOperation::LogicalAnd => Ok(a && b),
            BinaryOperation::LogicalOr => Ok(a || b),
            BinaryOperation::LogicalXor => Ok(a ^ b),
            _ => Err(unsupported::<Self>(op.name())),
        }
    }

    fn dot(_a: &[Self], _b: &[Self]) -> Result<Self> {
        Err(unsupported::<Self>("dot product"))
    }
}
