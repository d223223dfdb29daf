use super::map_outputs;
use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{InputPort, NodeId, OutputPort, PortType, PortValue};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};

/// 模型的外部輸入，值由 Evaluator 綁定
#[derive(Debug, Clone, PartialEq)]
pub struct InputNode {
    outputs: Vec<OutputPort>,
}

impl InputNode {
    pub fn new(port_type: PortType, size: usize) -> Self {
        Self {
            outputs: vec![OutputPort::new("output", port_type, size)],
        }
    }

    pub fn port_type(&self) -> PortType {
        self.outputs[0].port_type()
    }

    pub fn size(&self) -> usize {
        self.outputs[0].size()
    }
}

impl Default for InputNode {
    fn default() -> Self {
        Self::new(PortType::Real, 0)
    }
}

impl Describable for InputNode {
    fn type_name() -> &'static str {
        "InputNode"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("External input of the model");
        description.add_described_property::<OutputPort>("output", "Input values");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_description("output", self.outputs[0].description()?)?;
        Ok(description)
    }
}

impl Archivable for InputNode {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_object("output", &self.outputs[0])
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        let mut stored = OutputPort::new("output", PortType::default(), 0);
        unarchiver.read_object("output", &mut stored)?;
        *self = Self::new(stored.port_type(), stored.size());
        Ok(())
    }
}

impl Node for InputNode {
    fn input_ports(&self) -> Vec<&InputPort> {
        Vec::new()
    }

    fn output_ports(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn compute(&self, _inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        Err(IrError::compute("input nodes receive their value through evaluator binding"))
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        let new_id = transformer.add_node(self.clone())?;
        map_outputs(self, id, new_id, transformer)
    }

    fn is_input(&self) -> bool {
        true
    }
}
