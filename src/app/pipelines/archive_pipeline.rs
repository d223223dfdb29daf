use crate::adapters::json_archive::JsonArchive;
use crate::app::nodes::{builtin_context, InputNode, LinearPredictorNode};
use crate::app::predictors::LinearPredictor;
use crate::core::archive::{unarchive, Archiver};
use crate::core::graph::Model;
use crate::core::refine::{refine, RefinementOptions};
use crate::core::registry::SerializationContext;
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{NodeId, OutputReport, OutputRef, PortElements, PortType, PortValue, TransformResult};
use crate::domain::ports::{ArchiveFormat, ConfigProvider, Pipeline, Storage};
use crate::utils::error::{IrError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// 輸入節點加上一個線性預測器節點的示範模型
pub fn build_linear_predictor_model(predictor: LinearPredictor) -> Result<(Model, NodeId)> {
    let mut model = Model::new();
    let input = model.add_node(InputNode::new(PortType::Real, predictor.dimension()))?;
    let input = model.output(input, 0)?;
    let node = model.add_node(LinearPredictorNode::new(input, predictor)?)?;
    Ok((model, node))
}

/// Contents of the evaluation report written next to the refined model.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub node_count: usize,
    pub passes: usize,
    pub converged: bool,
    pub outputs: Vec<OutputReport>,
}

/// 讀取（或建立）模型、細化、求值並寫回封存檔
pub struct ArchivePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) format: JsonArchive,
    pub(crate) context: SerializationContext,
}

impl<S: Storage, C: ConfigProvider> ArchivePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            format: JsonArchive::pretty(),
            context: builtin_context(),
        }
    }

    fn report_name(model: &Model, output: OutputRef) -> Result<String> {
        let node = model.node(output.node)?;
        let port = node
            .output_ports()
            .get(output.index)
            .ok_or_else(|| IrError::not_found(format!("output {}", output)))?;
        Ok(format!(
            "{}[{}].{}",
            node.runtime_type_name(),
            output.node.0,
            port.name()
        ))
    }

    /// 對給定的元素求值；模型沒有輸入值時回傳 None
    fn evaluate(&self, model: &Model, targets: &[PortElements]) -> Result<Option<Vec<PortValue>>> {
        let inputs = self.config.inputs();
        if inputs.is_empty() && !model.input_nodes().is_empty() {
            return Ok(None);
        }

        let mut evaluator = model.evaluator();
        if !inputs.is_empty() {
            evaluator.bind_all_inputs(PortValue::Real(inputs.to_vec()))?;
        }
        let values = targets
            .iter()
            .map(|elements| evaluator.compute(elements))
            .collect::<Result<Vec<_>>>()?;
        debug!(nodes = evaluator.evaluated_nodes(), "Evaluation finished");
        Ok(Some(values))
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for ArchivePipeline<S, C> {
    fn extract(&self) -> Result<Model> {
        match self.config.model_path() {
            Some(path) => {
                info!(path, "Loading model archive");
                let root = self.format.load(&self.storage, path)?;
                let model: Model = unarchive(&root, &self.context)?;
                Ok(model)
            }
            None => {
                let predictor = LinearPredictor::new(
                    self.config.demo_weights().to_vec(),
                    self.config.demo_bias(),
                );
                info!(
                    dimension = predictor.dimension(),
                    "No model archive given, building linear predictor model"
                );
                let (model, _) = build_linear_predictor_model(predictor)?;
                Ok(model)
            }
        }
    }

    fn transform(&self, model: Model) -> Result<TransformResult> {
        model.validate()?;
        let sinks = model.sink_outputs();
        let original_targets = sinks
            .iter()
            .map(|sink| model.output(sink.node, sink.index))
            .collect::<Result<Vec<_>>>()?;

        let (final_model, passes, converged, targets) = if self.config.refine_enabled() {
            let options = RefinementOptions {
                max_passes: self.config.max_passes(),
            };
            let refinement = refine(&model, &options)?;
            let targets = sinks
                .iter()
                .map(|sink| refinement.corresponding_outputs(*sink))
                .collect::<Result<Vec<_>>>()?;
            (refinement.model, refinement.passes, refinement.converged, targets)
        } else {
            // 複製保留節點順序，原本的輸出位置仍然有效
            let copy = ModelTransformer::new().copy_model(&model)?;
            (copy, 0, true, original_targets.clone())
        };

        let mut outputs = Vec::new();
        match self.evaluate(&final_model, &targets)? {
            Some(values) => {
                if self.config.refine_enabled() && self.config.verify_refinement() {
                    let expected = self.evaluate(&model, &original_targets)?.unwrap_or_default();
                    for ((sink, actual), expected) in sinks.iter().zip(&values).zip(&expected) {
                        if actual != expected {
                            return Err(IrError::transform(format!(
                                "refined output {} differs from the original model",
                                sink
                            )));
                        }
                    }
                    info!(outputs = values.len(), "Refined outputs match the original model");
                }
                for (sink, values) in sinks.iter().zip(values) {
                    outputs.push(OutputReport {
                        name: Self::report_name(&model, *sink)?,
                        values,
                    });
                }
            }
            None => warn!("No input values given, skipping evaluation"),
        }

        Ok(TransformResult {
            model: final_model,
            passes,
            converged,
            outputs,
        })
    }

    fn load(&self, result: TransformResult) -> Result<String> {
        let model_path = format!("{}/{}", self.config.output_path(), self.config.model_file_name());
        let root = Archiver::archive(&result.model)?;
        self.format.save(&self.storage, &model_path, &root)?;

        let report = EvaluationReport {
            node_count: result.model.len(),
            passes: result.passes,
            converged: result.converged,
            outputs: result.outputs,
        };
        let report_path = format!("{}/{}", self.config.output_path(), self.config.report_file_name());
        self.storage
            .write_file(&report_path, &serde_json::to_vec_pretty(&report)?)?;
        info!(path = %report_path, "Evaluation report written");

        Ok(model_path)
    }
}
