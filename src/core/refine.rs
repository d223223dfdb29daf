use crate::core::graph::Model;
use crate::core::transformer::{remap_port_elements, ModelTransformer, PortMap};
use crate::domain::model::{NodeId, OutputRef, PortElements};
use crate::utils::error::{IrError, Result};
use tracing::{info, warn};

pub const DEFAULT_MAX_PASSES: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct RefinementOptions {
    pub max_passes: usize,
}

impl Default for RefinementOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

/// 細化結果：最終模型與原始輸出埠的對應
#[derive(Debug)]
pub struct Refinement {
    pub model: Model,
    /// Number of passes that rewrote at least one node.
    pub passes: usize,
    pub converged: bool,
    port_map: PortMap,
}

impl Refinement {
    /// Elements of the refined model that carry the original output.
    pub fn corresponding_outputs(&self, output: OutputRef) -> Result<PortElements> {
        self.port_map
            .get(&output)
            .cloned()
            .ok_or_else(|| IrError::not_found(format!("mapping of output {}", output)))
    }

    /// 原始節點的第一個輸出所對應到的節點（若整段落在單一節點上）
    pub fn corresponding_node(&self, id: NodeId) -> Result<NodeId> {
        let elements = self.corresponding_outputs(id.output(0))?;
        match elements.ranges() {
            [range, rest @ ..] if rest.iter().all(|r| r.node == range.node) => Ok(range.node),
            _ => Err(IrError::not_found(format!("single node corresponding to {}", id))),
        }
    }

    pub fn port_map(&self) -> &PortMap {
        &self.port_map
    }
}

fn compose(previous: Option<PortMap>, pass_map: &PortMap) -> Result<PortMap> {
    match previous {
        None => Ok(pass_map.clone()),
        Some(mut map) => {
            for elements in map.values_mut() {
                *elements = remap_port_elements(pass_map, elements)?;
            }
            Ok(map)
        }
    }
}

/// Refines `model` until a pass rewrites nothing or `max_passes` is reached.
pub fn refine(model: &Model, options: &RefinementOptions) -> Result<Refinement> {
    let mut transformer = ModelTransformer::new();
    let mut current: Option<Model> = None;
    let mut composed: Option<PortMap> = None;
    let mut passes = 0;

    let converged = loop {
        let source = current.as_ref().unwrap_or(model);
        let refined = transformer.refine_model(source)?;
        let modified = transformer.is_modified();

        // 已用完上限，捨棄這一輪的改寫
        if modified && passes >= options.max_passes {
            break false;
        }

        composed = Some(compose(composed, transformer.port_map())?);
        if modified {
            passes += 1;
            info!(
                pass = passes,
                nodes_before = source.len(),
                nodes_after = refined.len(),
                "Refinement pass complete"
            );
        }
        current = Some(refined);
        if !modified {
            break true;
        }
    };

    if !converged {
        warn!(
            max_passes = options.max_passes,
            "Refinement did not reach a fixed point"
        );
    }

    let (model, port_map) = match (current, composed) {
        (Some(model), Some(port_map)) => (model, port_map),
        _ => {
            let copy = transformer.copy_model(model)?;
            (copy, transformer.port_map().clone())
        }
    };

    Ok(Refinement {
        model,
        passes,
        converged,
        port_map,
    })
}
