use crate::core::graph::Model;
use crate::domain::model::{NodeId, OutputRef, PortElements};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 將來源模型的輸出埠對應到目標模型的元素
pub type PortMap = HashMap<OutputRef, PortElements>;

/// Builds a new model from an existing one, node by node.
///
/// Each source node either copies itself or refines into an equivalent
/// subgraph; in both cases it must map every one of its output ports to
/// elements of the target model.
#[derive(Debug, Default)]
pub struct ModelTransformer {
    model: Model,
    port_map: PortMap,
    modified: bool,
    // 來源模型各輸出埠的大小，用來確認對應涵蓋整個埠
    source_sizes: HashMap<OutputRef, usize>,
}

impl ModelTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 目前建構中的目標模型
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn add_node<N: Node + 'static>(&mut self, node: N) -> Result<NodeId> {
        self.model.add_node(node)
    }

    pub fn output(&self, id: NodeId, index: usize) -> Result<PortElements> {
        self.model.output(id, index)
    }

    /// Rewrites source-model references into target-model references.
    pub fn transform_port_elements(&self, elements: &PortElements) -> Result<PortElements> {
        remap_port_elements(&self.port_map, elements)
    }

    /// 對應一個來源輸出埠；重複對應到相同目標不會出錯
    pub fn map_node_output(&mut self, old: &PortElements, new: PortElements) -> Result<()> {
        let key = match old.ranges() {
            [range] if range.start == 0 => range.output_ref(),
            _ => {
                return Err(IrError::transform(
                    "only a whole output port can be mapped",
                ))
            }
        };
        if let Some(&size) = self.source_sizes.get(&key) {
            if old.size() != size {
                return Err(IrError::transform(format!(
                    "mapping covers {} of {} elements of output {}",
                    old.size(),
                    size,
                    key
                )));
            }
        }

        if old.port_type() != new.port_type() {
            return Err(IrError::type_mismatch(
                old.port_type().map(|t| t.name()).unwrap_or("none"),
                new.port_type().map(|t| t.name()).unwrap_or("none"),
            ));
        }
        if old.size() != new.size() {
            return Err(IrError::dimension_mismatch(
                format!("mapping of output {}", key),
                old.size(),
                new.size(),
            ));
        }
        for range in new.ranges() {
            let output = self.model.output(range.node, range.output)?;
            if range.start + range.size > output.size() {
                return Err(IrError::dimension_mismatch(
                    format!("mapping of output {}", key),
                    output.size(),
                    range.start + range.size,
                ));
            }
        }

        if let Some(existing) = self.port_map.get(&key) {
            if *existing != new {
                return Err(IrError::transform(format!(
                    "output {} is already mapped to different elements",
                    key
                )));
            }
            return Ok(());
        }
        self.port_map.insert(key, new);
        Ok(())
    }

    pub fn port_map(&self) -> &PortMap {
        &self.port_map
    }

    /// 上一次 refine_model 是否有節點被改寫
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn reset(&mut self, source: &Model) {
        self.model = Model::new();
        self.port_map.clear();
        self.modified = false;
        self.source_sizes = source
            .nodes()
            .flat_map(|(id, node)| {
                node.output_ports()
                    .iter()
                    .enumerate()
                    .map(move |(index, port)| (id.output(index), port.size()))
            })
            .collect();
    }

    pub fn copy_model(&mut self, source: &Model) -> Result<Model> {
        self.reset(source);
        for (id, node) in source.nodes() {
            debug!(node = id.0, kind = node.runtime_type_name(), "Copying node");
            node.copy(id, self)?;
        }
        self.check_all_mapped(source)?;
        Ok(std::mem::take(&mut self.model))
    }

    /// One refinement pass over `source`.
    pub fn refine_model(&mut self, source: &Model) -> Result<Model> {
        self.reset(source);
        for (id, node) in source.nodes() {
            let mark = self.model.len();
            match node.refine(id, self) {
                Ok(true) => {
                    debug!(node = id.0, kind = node.runtime_type_name(), "Refined node");
                    self.modified = true;
                }
                Ok(false) => {
                    self.rollback(mark, id);
                    node.copy(id, self)?;
                }
                Err(e) => {
                    warn!(
                        node = id.0,
                        kind = node.runtime_type_name(),
                        error = %e,
                        "Refinement failed, copying node instead"
                    );
                    self.rollback(mark, id);
                    node.copy(id, self)?;
                }
            }
        }
        self.check_all_mapped(source)?;
        Ok(std::mem::take(&mut self.model))
    }

    fn rollback(&mut self, mark: usize, id: NodeId) {
        self.model.truncate(mark);
        self.port_map.retain(|output, _| output.node != id);
    }

    fn check_all_mapped(&self, source: &Model) -> Result<()> {
        for (id, node) in source.nodes() {
            for (index, port) in node.output_ports().iter().enumerate() {
                match self.port_map.get(&id.output(index)) {
                    Some(elements) if elements.size() == port.size() => {}
                    Some(elements) => {
                        return Err(IrError::dimension_mismatch(
                            format!("mapping of output '{}' of node {}", port.name(), id),
                            port.size(),
                            elements.size(),
                        ))
                    }
                    None => {
                        return Err(IrError::transform(format!(
                            "output '{}' of node {} ({}) was not mapped",
                            port.name(),
                            id,
                            node.runtime_type_name()
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn remap_port_elements(map: &PortMap, elements: &PortElements) -> Result<PortElements> {
    let mut result = PortElements::default();
    for range in elements.ranges() {
        let target = map.get(&range.output_ref()).ok_or_else(|| {
            IrError::transform(format!("output {} has no mapping", range.output_ref()))
        })?;
        result.append(&target.slice(range.start, range.size)?)?;
    }
    Ok(result)
}
