use super::{check_output_port, generic_type_name, map_outputs};
use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{Element, InputPort, NodeId, OutputPort, PortValue};
use crate::domain::ports::Node;
use crate::utils::error::Result;

/// 輸出固定值的節點
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode<T: Element> {
    values: Vec<T>,
    outputs: Vec<OutputPort>,
}

impl<T: Element> ConstantNode<T> {
    pub fn new(values: Vec<T>) -> Self {
        let outputs = vec![OutputPort::new("output", T::PORT_TYPE, values.len())];
        Self { values, outputs }
    }

    pub fn scalar(value: T) -> Self {
        Self::new(vec![value])
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Element> Default for ConstantNode<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Element> Describable for ConstantNode<T> {
    fn type_name() -> &'static str {
        generic_type_name::<T>(["ConstantNode<real>", "ConstantNode<int>", "ConstantNode<bool>"])
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Constant value source");
        description
            .add_property::<Vec<T>>("values", "Output values")
            .add_described_property::<OutputPort>("output", "Constant output");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_value("values", self.values.clone())?;
        description.set_property_description("output", self.outputs[0].description()?)?;
        Ok(description)
    }
}

impl<T: Element> Archivable for ConstantNode<T> {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write("values", &self.values)?;
        archiver.write_object("output", &self.outputs[0])
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        *self = Self::new(unarchiver.read("values")?);
        check_output_port(unarchiver, &self.outputs[0])
    }
}

impl<T: Element> Node for ConstantNode<T> {
    fn input_ports(&self) -> Vec<&InputPort> {
        Vec::new()
    }

    fn output_ports(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn compute(&self, _inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        Ok(vec![T::wrap(self.values.clone())])
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        let new_id = transformer.add_node(self.clone())?;
        map_outputs(self, id, new_id, transformer)
    }
}
