pub mod binary_operation;
pub mod constant;
pub mod dot_product;
pub mod input;
pub mod linear_predictor;

pub use binary_operation::BinaryOperationNode;
pub use constant::ConstantNode;
pub use dot_product::DotProductNode;
pub use input::InputNode;
pub use linear_predictor::LinearPredictorNode;

use crate::core::archive::Unarchiver;
use crate::core::registry::SerializationContext;
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{Element, InputPort, NodeId, OutputPort, PortElements, PortType, PortValue};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};

/// 註冊所有內建節點種類
pub fn builtin_context() -> SerializationContext {
    let mut context = SerializationContext::new();
    context
        .register_node::<InputNode>()
        .register_node::<ConstantNode<f64>>()
        .register_node::<ConstantNode<i64>>()
        .register_node::<ConstantNode<bool>>()
        .register_node::<DotProductNode<f64>>()
        .register_node::<DotProductNode<i64>>()
        .register_node::<BinaryOperationNode<f64>>()
        .register_node::<BinaryOperationNode<i64>>()
        .register_node::<BinaryOperationNode<bool>>()
        .register_node::<LinearPredictorNode>();
    context
}

/// Type name of a node generic over its element type, e.g. `ConstantNode<real>`.
pub(crate) fn generic_type_name<T: Element>(names: [&'static str; 3]) -> &'static str {
    match T::PORT_TYPE {
        PortType::Real => names[0],
        PortType::Integer => names[1],
        PortType::Boolean => names[2],
    }
}

/// 將 `node` 的每個輸出埠對應到目標模型中 `new_id` 的同位置輸出
pub(crate) fn map_outputs(
    node: &dyn Node,
    id: NodeId,
    new_id: NodeId,
    transformer: &mut ModelTransformer,
) -> Result<()> {
    for index in 0..node.output_ports().len() {
        let old = node.output_elements(id, index)?;
        let new = transformer.output(new_id, index)?;
        transformer.map_node_output(&old, new)?;
    }
    Ok(())
}

pub(crate) fn input_values<T: Element>(inputs: &[PortValue], index: usize) -> Result<&[T]> {
    inputs
        .get(index)
        .ok_or_else(|| IrError::dimension_mismatch("node inputs", index + 1, inputs.len()))?
        .values::<T>()
}

pub(crate) fn read_input_port(unarchiver: &Unarchiver<'_>, name: &str, port_type: PortType) -> Result<PortElements> {
    let mut elements = PortElements::default();
    unarchiver.read_object(name, &mut elements)?;
    // 型別檢查交給 InputPort::new
    InputPort::new(name, port_type, elements.clone())?;
    Ok(elements)
}

/// 讀回已封存的輸出埠，並確認與重建後的節點一致
pub(crate) fn check_output_port(unarchiver: &Unarchiver<'_>, expected: &OutputPort) -> Result<()> {
    let mut stored = OutputPort::new(expected.name(), PortType::default(), 0);
    unarchiver.read_object(expected.name(), &mut stored)?;
    if stored.port_type() != expected.port_type() {
        return Err(IrError::type_mismatch(
            expected.port_type().name(),
            stored.port_type().name(),
        ));
    }
    if stored.size() != expected.size() {
        return Err(IrError::dimension_mismatch(
            format!("stored output '{}'", expected.name()),
            expected.size(),
            stored.size(),
        ));
    }
    Ok(())
}
