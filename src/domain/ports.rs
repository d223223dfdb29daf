use crate::core::archive::{Archivable, ArchivedObject};
use crate::core::graph::Model;
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{InputPort, NodeId, OutputPort, PortElements, PortRange, PortValue, TransformResult};
use crate::utils::error::{IrError, Result};
use std::fmt::Debug;

/// 計算圖中的節點
///
/// Nodes only refer to upstream data through the `PortElements` of their
/// input ports; the owning `Model` assigns the `NodeId`.
pub trait Node: Archivable + Debug {
    fn input_ports(&self) -> Vec<&InputPort>;

    fn output_ports(&self) -> &[OutputPort];

    /// One value per input port in, one value per output port out.
    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>>;

    /// 將自己複製到 transformer 的目標模型，並對應所有輸出埠
    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()>;

    /// Rewrites this node into an equivalent subgraph. `Ok(false)` declines.
    fn refine(&self, _id: NodeId, _transformer: &mut ModelTransformer) -> Result<bool> {
        Ok(false)
    }

    fn is_input(&self) -> bool {
        false
    }

    fn output_elements(&self, id: NodeId, index: usize) -> Result<PortElements> {
        let port = self
            .output_ports()
            .get(index)
            .ok_or_else(|| IrError::not_found(format!("output {} of node {}", index, id)))?;
        Ok(PortRange::full(id.output(index), port.port_type(), port.size()).into())
    }
}

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider {
    fn model_path(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn refine_enabled(&self) -> bool;
    fn max_passes(&self) -> usize;
    fn verify_refinement(&self) -> bool;
    fn inputs(&self) -> &[f64];
    fn demo_weights(&self) -> &[f64];
    fn demo_bias(&self) -> f64;

    fn model_file_name(&self) -> &str {
        "model.json"
    }

    fn report_file_name(&self) -> &str {
        "evaluation.json"
    }
}

pub trait Pipeline {
    fn extract(&self) -> Result<Model>;
    fn transform(&self, model: Model) -> Result<TransformResult>;
    fn load(&self, result: TransformResult) -> Result<String>;
}

/// 封存樹與位元組之間的編碼
pub trait ArchiveFormat {
    fn encode(&self, root: &ArchivedObject) -> Result<Vec<u8>>;
    fn decode(&self, data: &[u8]) -> Result<ArchivedObject>;

    fn save<S: Storage>(&self, storage: &S, path: &str, root: &ArchivedObject) -> Result<()>
    where
        Self: Sized,
    {
        let data = self.encode(root)?;
        storage.write_file(path, &data)
    }

    fn load<S: Storage>(&self, storage: &S, path: &str) -> Result<ArchivedObject>
    where
        Self: Sized,
    {
        let data = storage.read_file(path)?;
        self.decode(&data)
    }
}
