use crate::core::graph::Model;
use crate::domain::model::{NodeId, OutputRef, PortElements, PortType, PortValue};
use crate::utils::error::{IrError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 拉取式求值器
///
/// Only the dependency cone of a requested output is computed, and each node
/// is computed at most once per evaluation cycle. Binding an input value
/// starts a new cycle.
#[derive(Debug)]
pub struct Evaluator<'m> {
    model: &'m Model,
    bindings: HashMap<NodeId, PortValue>,
    cache: HashMap<NodeId, Vec<PortValue>>,
}

impl<'m> Evaluator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            bindings: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    pub fn bind_input(&mut self, id: NodeId, value: PortValue) -> Result<()> {
        let node = self.model.node(id)?;
        if !node.is_input() {
            return Err(IrError::type_mismatch("input node", node.runtime_type_name()));
        }
        let port = node
            .output_ports()
            .first()
            .ok_or_else(|| IrError::not_found(format!("output of input node {}", id)))?;
        if port.port_type() != value.port_type() {
            return Err(IrError::type_mismatch(port.port_type().name(), value.port_type().name()));
        }
        if port.size() != value.len() {
            return Err(IrError::dimension_mismatch(
                format!("input node {}", id),
                port.size(),
                value.len(),
            ));
        }

        self.bindings.insert(id, value);
        self.cache.clear();
        Ok(())
    }

    /// 將一段值依序分配給模型中的所有輸入節點
    pub fn bind_all_inputs(&mut self, value: PortValue) -> Result<()> {
        let inputs = self.model.input_nodes();
        let mut sizes = Vec::with_capacity(inputs.len());
        for id in &inputs {
            sizes.push(self.model.output(*id, 0)?.size());
        }

        let total: usize = sizes.iter().sum();
        if total != value.len() {
            return Err(IrError::dimension_mismatch("model inputs", total, value.len()));
        }

        let mut offset = 0;
        for (id, size) in inputs.into_iter().zip(sizes) {
            self.bind_input(id, value.slice(offset, size)?)?;
            offset += size;
        }
        Ok(())
    }

    /// Gathers the referenced elements, evaluating upstream nodes as needed.
    pub fn compute(&mut self, elements: &PortElements) -> Result<PortValue> {
        self.gather(elements.port_type().unwrap_or_default(), elements)
    }

    pub fn compute_output(&mut self, output: OutputRef) -> Result<PortValue> {
        self.evaluate(output.node)?
            .get(output.index)
            .cloned()
            .ok_or_else(|| IrError::not_found(format!("output {}", output)))
    }

    pub fn compute_node(&mut self, id: NodeId) -> Result<Vec<PortValue>> {
        Ok(self.evaluate(id)?.clone())
    }

    /// 本輪已計算的節點數
    pub fn evaluated_nodes(&self) -> usize {
        self.cache.len()
    }

    fn gather(&mut self, port_type: PortType, elements: &PortElements) -> Result<PortValue> {
        let mut result = PortValue::empty(port_type);
        for range in elements.ranges() {
            let part = {
                let outputs = self.evaluate(range.node)?;
                let output = outputs
                    .get(range.output)
                    .ok_or_else(|| IrError::not_found(format!("output {}", range.output_ref())))?;
                output.slice(range.start, range.size)?
            };
            result.extend_from(&part)?;
        }
        Ok(result)
    }

    fn evaluate(&mut self, id: NodeId) -> Result<&Vec<PortValue>> {
        if !self.cache.contains_key(&id) {
            // 依 NodeId 遞增計算即為拓撲順序，上游結果一定先進快取
            for pending in self.uncached_cone(id)? {
                let outputs = self.compute_uncached(pending)?;
                self.cache.insert(pending, outputs);
            }
        }
        self.cache
            .get(&id)
            .ok_or_else(|| IrError::not_found(format!("node {}", id)))
    }

    /// Uncached nodes `id` depends on (itself included), in ascending order.
    fn uncached_cone(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.cache.contains_key(&current) || !visited.insert(current) {
                continue;
            }
            let node = self.model.node(current)?;
            for port in node.input_ports() {
                stack.extend(port.elements().ranges().iter().map(|range| range.node));
            }
        }

        let mut pending: Vec<NodeId> = visited.into_iter().collect();
        pending.sort_unstable();
        Ok(pending)
    }

    fn compute_uncached(&mut self, id: NodeId) -> Result<Vec<PortValue>> {
        let model = self.model;
        let node = model.node(id)?;

        let outputs = if node.is_input() {
            let value = self
                .bindings
                .get(&id)
                .cloned()
                .ok_or(IrError::UnboundInput { node: id.0 })?;
            vec![value]
        } else {
            let mut inputs = Vec::new();
            for port in node.input_ports() {
                inputs.push(self.gather(port.port_type(), port.elements())?);
            }
            node.compute(&inputs)?
        };

        let declared = node.output_ports();
        if outputs.len() != declared.len() {
            return Err(IrError::dimension_mismatch(
                format!("output count of node {}", id),
                declared.len(),
                outputs.len(),
            ));
        }
        for (port, value) in declared.iter().zip(&outputs) {
            if port.port_type() != value.port_type() {
                return Err(IrError::type_mismatch(port.port_type().name(), value.port_type().name()));
            }
            if port.size() != value.len() {
                return Err(IrError::dimension_mismatch(
                    format!("output '{}' of node {}", port.name(), id),
                    port.size(),
                    value.len(),
                ));
            }
        }

        debug!(node = id.0, kind = node.runtime_type_name(), "Evaluated node");
        Ok(outputs)
    }
}
