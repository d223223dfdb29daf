use super::{check_output_port, generic_type_name, input_values, map_outputs, read_input_port};
use crate::app::math::{BinaryOperation, Operand};
use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{InputPort, NodeId, OutputPort, PortElements, PortValue};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};
use std::marker::PhantomData;

/// 兩個等長向量的逐元素運算
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperationNode<T: Operand> {
    input1: InputPort,
    input2: InputPort,
    operation: BinaryOperation,
    outputs: Vec<OutputPort>,
    _element: PhantomData<T>,
}

impl<T: Operand> BinaryOperationNode<T> {
    pub fn new(input1: PortElements, input2: PortElements, operation: BinaryOperation) -> Result<Self> {
        if !T::supports(operation) {
            return Err(IrError::type_mismatch(
                format!("element type supporting {}", operation),
                T::PORT_TYPE.name(),
            ));
        }
        if input1.size() != input2.size() {
            return Err(IrError::dimension_mismatch(
                format!("{} inputs", operation),
                input1.size(),
                input2.size(),
            ));
        }
        let size = input1.size();
        Ok(Self {
            input1: InputPort::new("input1", T::PORT_TYPE, input1)?,
            input2: InputPort::new("input2", T::PORT_TYPE, input2)?,
            operation,
            outputs: vec![OutputPort::new("output", T::PORT_TYPE, size)],
            _element: PhantomData,
        })
    }

    pub fn operation(&self) -> BinaryOperation {
        self.operation
    }
}

impl<T: Operand> Default for BinaryOperationNode<T> {
    fn default() -> Self {
        Self {
            input1: InputPort::unconnected("input1", T::PORT_TYPE),
            input2: InputPort::unconnected("input2", T::PORT_TYPE),
            operation: BinaryOperation::default(),
            outputs: vec![OutputPort::new("output", T::PORT_TYPE, 0)],
            _element: PhantomData,
        }
    }
}

impl<T: Operand> Describable for BinaryOperationNode<T> {
    fn type_name() -> &'static str {
        generic_type_name::<T>([
            "BinaryOperationNode<real>",
            "BinaryOperationNode<int>",
            "BinaryOperationNode<bool>",
        ])
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Elementwise binary operation");
        description
            .add_described_property::<PortElements>("input1", "First operand")
            .add_described_property::<PortElements>("input2", "Second operand")
            .add_property::<String>("operation", "Operation name")
            .add_described_property::<OutputPort>("output", "Elementwise result");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_description("input1", self.input1.elements().description()?)?;
        description.set_property_description("input2", self.input2.elements().description()?)?;
        description.set_property_value("operation", self.operation.name().to_string())?;
        description.set_property_description("output", self.outputs[0].description()?)?;
        Ok(description)
    }
}

impl<T: Operand> Archivable for BinaryOperationNode<T> {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_object("input1", self.input1.elements())?;
        archiver.write_object("input2", self.input2.elements())?;
        archiver.write("operation", &self.operation.name().to_string())?;
        archiver.write_object("output", &self.outputs[0])
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        let input1 = read_input_port(unarchiver, "input1", T::PORT_TYPE)?;
        let input2 = read_input_port(unarchiver, "input2", T::PORT_TYPE)?;
        let operation = BinaryOperation::from_name(&unarchiver.read::<String>("operation")?)?;
        *self = Self::new(input1, input2, operation)?;
        check_output_port(unarchiver, &self.outputs[0])
    }
}

impl<T: Operand> Node for BinaryOperationNode<T> {
    fn input_ports(&self) -> Vec<&InputPort> {
        vec![&self.input1, &self.input2]
    }

    fn output_ports(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        let a = input_values::<T>(inputs, 0)?;
        let b = input_values::<T>(inputs, 1)?;
        if a.len() != b.len() {
            return Err(IrError::dimension_mismatch(
                format!("{} operands", self.operation),
                a.len(),
                b.len(),
            ));
        }
        let values = a
            .iter()
            .zip(b)
            .map(|(x, y)| T::apply(self.operation, *x, *y))
            .collect::<Result<Vec<T>>>()?;
        Ok(vec![T::wrap(values)])
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        let input1 = transformer.transform_port_elements(self.input1.elements())?;
        let input2 = transformer.transform_port_elements(self.input2.elements())?;
        let new_id = transformer.add_node(Self::new(input1, input2, self.operation)?)?;
        map_outputs(self, id, new_id, transformer)
    }
}
