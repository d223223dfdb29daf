use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::evaluator::Evaluator;
use crate::domain::model::{NodeId, OutputRef, PortElements};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};
use std::collections::HashSet;
use tracing::debug;

/// 節點的 arena，插入順序即為拓撲順序
#[derive(Debug, Default)]
pub struct Model {
    nodes: Vec<Box<dyn Node>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node<N: Node + 'static>(&mut self, node: N) -> Result<NodeId> {
        self.add_boxed_node(Box::new(node))
    }

    /// Appends a node after checking that its inputs only reference earlier nodes.
    pub fn add_boxed_node(&mut self, node: Box<dyn Node>) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        self.check_inputs(id, node.as_ref())?;
        debug!(node = id.0, kind = node.runtime_type_name(), "Added node");
        self.nodes.push(node);
        Ok(id)
    }

    fn check_inputs(&self, id: NodeId, node: &dyn Node) -> Result<()> {
        for port in node.input_ports() {
            for range in port.elements().ranges() {
                if range.node >= id {
                    return Err(IrError::CyclicReference {
                        node: id.0,
                        referenced: range.node.0,
                    });
                }

                let upstream = self.nodes[range.node.0].output_ports();
                let output = upstream.get(range.output).ok_or_else(|| {
                    IrError::not_found(format!("output {} of node {}", range.output, range.node))
                })?;
                if output.port_type() != range.port_type {
                    return Err(IrError::type_mismatch(
                        output.port_type().name(),
                        range.port_type.name(),
                    ));
                }
                if range.start + range.size > output.size() {
                    return Err(IrError::dimension_mismatch(
                        format!("input '{}' of node {}", port.name(), id),
                        output.size(),
                        range.start + range.size,
                    ));
                }
            }
        }
        Ok(())
    }

    /// 重新檢查所有節點只引用先前插入的節點
    pub fn validate(&self) -> Result<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            self.check_inputs(NodeId(i), node.as_ref())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&dyn Node> {
        self.nodes
            .get(id.0)
            .map(|n| n.as_ref())
            .ok_or_else(|| IrError::not_found(format!("node {}", id)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &dyn Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i), n.as_ref()))
    }

    pub fn output(&self, id: NodeId, index: usize) -> Result<PortElements> {
        self.node(id)?.output_elements(id, index)
    }

    pub fn output_named(&self, id: NodeId, name: &str) -> Result<PortElements> {
        let node = self.node(id)?;
        let index = node
            .output_ports()
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| IrError::not_found(format!("output '{}' of node {}", name, id)))?;
        node.output_elements(id, index)
    }

    pub fn input_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.is_input())
            .map(|(id, _)| id)
            .collect()
    }

    /// Outputs that no node in the model consumes, in topological order.
    pub fn sink_outputs(&self) -> Vec<OutputRef> {
        let consumed: HashSet<OutputRef> = self
            .nodes
            .iter()
            .flat_map(|node| node.input_ports())
            .flat_map(|port| port.elements().ranges().iter().map(|r| r.output_ref()))
            .collect();

        self.nodes()
            .flat_map(|(id, node)| (0..node.output_ports().len()).map(move |i| id.output(i)))
            .filter(|output| !consumed.contains(output))
            .collect()
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(self)
    }

    // 回復失敗的細化時使用
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}

impl Describable for Model {
    fn type_name() -> &'static str {
        "Model"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Dataflow graph of nodes in topological order");
        description.add_composite_property("nodes", ObjectDescription::new("Node[]", "Nodes in insertion order"));
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        let nodes = description.property_mut("nodes")?;
        for (id, node) in self.nodes() {
            nodes.add_composite_property(&id.0.to_string(), node.description()?);
        }
        Ok(description)
    }
}

impl Archivable for Model {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_array("nodes", self.nodes.iter().map(|n| n.as_ref()))
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        let nodes = unarchiver.read_array("nodes", |item| item.instantiate_node())?;
        let mut model = Model::new();
        for node in nodes {
            model.add_boxed_node(node)?;
        }
        *self = model;
        Ok(())
    }
}
