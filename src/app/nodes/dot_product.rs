use super::{check_output_port, generic_type_name, input_values, map_outputs, read_input_port};
use crate::app::math::Operand;
use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{InputPort, NodeId, OutputPort, PortElements, PortValue};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};
use std::marker::PhantomData;

/// 兩個等長向量的內積
#[derive(Debug, Clone, PartialEq)]
pub struct DotProductNode<T: Operand> {
    input1: InputPort,
    input2: InputPort,
    outputs: Vec<OutputPort>,
    _element: PhantomData<T>,
}

impl<T: Operand> DotProductNode<T> {
    pub fn new(input1: PortElements, input2: PortElements) -> Result<Self> {
        if !T::supports_dot() {
            return Err(IrError::type_mismatch("numeric element type", T::PORT_TYPE.name()));
        }
        if input1.size() != input2.size() {
            return Err(IrError::dimension_mismatch("dot product inputs", input1.size(), input2.size()));
        }
        Ok(Self {
            input1: InputPort::new("input1", T::PORT_TYPE, input1)?,
            input2: InputPort::new("input2", T::PORT_TYPE, input2)?,
            outputs: vec![OutputPort::new("output", T::PORT_TYPE, 1)],
            _element: PhantomData,
        })
    }
}

impl<T: Operand> Default for DotProductNode<T> {
    fn default() -> Self {
        Self {
            input1: InputPort::unconnected("input1", T::PORT_TYPE),
            input2: InputPort::unconnected("input2", T::PORT_TYPE),
            outputs: vec![OutputPort::new("output", T::PORT_TYPE, 1)],
            _element: PhantomData,
        }
    }
}

impl<T: Operand> Describable for DotProductNode<T> {
    fn type_name() -> &'static str {
        generic_type_name::<T>(["DotProductNode<real>", "DotProductNode<int>", "DotProductNode<bool>"])
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Dot product of two vectors");
        description
            .add_described_property::<PortElements>("input1", "First operand")
            .add_described_property::<PortElements>("input2", "Second operand")
            .add_described_property::<OutputPort>("output", "Scalar result");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_description("input1", self.input1.elements().description()?)?;
        description.set_property_description("input2", self.input2.elements().description()?)?;
        description.set_property_description("output", self.outputs[0].description()?)?;
        Ok(description)
    }
}

impl<T: Operand> Archivable for DotProductNode<T> {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_object("input1", self.input1.elements())?;
        archiver.write_object("input2", self.input2.elements())?;
        archiver.write_object("output", &self.outputs[0])
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        let input1 = read_input_port(unarchiver, "input1", T::PORT_TYPE)?;
        let input2 = read_input_port(unarchiver, "input2", T::PORT_TYPE)?;
        *self = Self::new(input1, input2)?;
        check_output_port(unarchiver, &self.outputs[0])
    }
}

impl<T: Operand> Node for DotProductNode<T> {
    fn input_ports(&self) -> Vec<&InputPort> {
        vec![&self.input1, &self.input2]
    }

    fn output_ports(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        let a = input_values::<T>(inputs, 0)?;
        let b = input_values::<T>(inputs, 1)?;
        Ok(vec![T::wrap(vec![T::dot(a, b)?])])
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        let input1 = transformer.transform_port_elements(self.input1.elements())?;
        let input2 = transformer.transform_port_elements(self.input2.elements())?;
        let new_id = transformer.add_node(Self::new(input1, input2)?)?;
        map_outputs(self, id, new_id, transformer)
    }
}
