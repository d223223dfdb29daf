use super::{check_output_port, input_values, map_outputs, read_input_port};
use crate::app::math::BinaryOperation;
use crate::app::nodes::{BinaryOperationNode, ConstantNode, DotProductNode};
use crate::app::predictors::LinearPredictor;
use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::transformer::ModelTransformer;
use crate::domain::model::{InputPort, NodeId, OutputPort, PortElements, PortType, PortValue};
use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};

pub const INPUT_PORT_NAME: &str = "input";
pub const OUTPUT_PORT_NAME: &str = "output";
pub const WEIGHTED_ELEMENTS_PORT_NAME: &str = "weightedElements";

/// 以線性預測器計算輸出的高階節點
///
/// Outputs the prediction (size 1) and the per-dimension weighted elements.
/// Refines into constant, dot-product and elementwise nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictorNode {
    input: InputPort,
    predictor: LinearPredictor,
    outputs: Vec<OutputPort>,
}

impl LinearPredictorNode {
    pub fn new(input: PortElements, predictor: LinearPredictor) -> Result<Self> {
        if input.size() != predictor.dimension() {
            return Err(IrError::dimension_mismatch(
                "linear predictor node input",
                predictor.dimension(),
                input.size(),
            ));
        }
        let dimension = predictor.dimension();
        Ok(Self {
            input: InputPort::new(INPUT_PORT_NAME, PortType::Real, input)?,
            predictor,
            outputs: vec![
                OutputPort::new(OUTPUT_PORT_NAME, PortType::Real, 1),
                OutputPort::new(WEIGHTED_ELEMENTS_PORT_NAME, PortType::Real, dimension),
            ],
        })
    }

    pub fn predictor(&self) -> &LinearPredictor {
        &self.predictor
    }
}

impl Default for LinearPredictorNode {
    fn default() -> Self {
        Self {
            input: InputPort::unconnected(INPUT_PORT_NAME, PortType::Real),
            predictor: LinearPredictor::default(),
            outputs: vec![
                OutputPort::new(OUTPUT_PORT_NAME, PortType::Real, 1),
                OutputPort::new(WEIGHTED_ELEMENTS_PORT_NAME, PortType::Real, 0),
            ],
        }
    }
}

impl Describable for LinearPredictorNode {
    fn type_name() -> &'static str {
        "LinearPredictorNode"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Linear predictor applied to an input vector");
        description
            .add_described_property::<PortElements>(INPUT_PORT_NAME, "Input vector")
            .add_described_property::<OutputPort>(OUTPUT_PORT_NAME, "Prediction")
            .add_described_property::<OutputPort>(WEIGHTED_ELEMENTS_PORT_NAME, "Weighted input elements")
            .add_described_property::<LinearPredictor>("predictor", "The predictor");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_description(INPUT_PORT_NAME, self.input.elements().description()?)?;
        description.set_property_description(OUTPUT_PORT_NAME, self.outputs[0].description()?)?;
        description.set_property_description(WEIGHTED_ELEMENTS_PORT_NAME, self.outputs[1].description()?)?;
        description.set_property_description("predictor", self.predictor.description()?)?;
        Ok(description)
    }
}

impl Archivable for LinearPredictorNode {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_object(INPUT_PORT_NAME, self.input.elements())?;
        archiver.write_object(OUTPUT_PORT_NAME, &self.outputs[0])?;
        archiver.write_object(WEIGHTED_ELEMENTS_PORT_NAME, &self.outputs[1])?;
        archiver.write_object("predictor", &self.predictor)
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        let input = read_input_port(unarchiver, INPUT_PORT_NAME, PortType::Real)?;
        let mut predictor = LinearPredictor::default();
        unarchiver.read_object("predictor", &mut predictor)?;

        *self = Self::new(input, predictor)?;
        for port in &self.outputs {
            check_output_port(unarchiver, port)?;
        }
        Ok(())
    }
}

impl Node for LinearPredictorNode {
    fn input_ports(&self) -> Vec<&InputPort> {
        vec![&self.input]
    }

    fn output_ports(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        let x = input_values::<f64>(inputs, 0)?;
        Ok(vec![
            PortValue::Real(vec![self.predictor.predict(x)?]),
            PortValue::Real(self.predictor.weighted_elements(x)?),
        ])
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        let input = transformer.transform_port_elements(self.input.elements())?;
        let new_id = transformer.add_node(Self::new(input, self.predictor.clone())?)?;
        map_outputs(self, id, new_id, transformer)
    }

    fn refine(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<bool> {
        let input = transformer.transform_port_elements(self.input.elements())?;

        let weights = transformer.add_node(ConstantNode::new(self.predictor.weights().to_vec()))?;
        let weights = transformer.output(weights, 0)?;

        let dot = transformer.add_node(DotProductNode::<f64>::new(weights.clone(), input.clone())?)?;
        let dot = transformer.output(dot, 0)?;

        let weighted = transformer.add_node(BinaryOperationNode::<f64>::new(
            weights,
            input,
            BinaryOperation::CoordinatewiseMultiply,
        )?)?;

        let bias = transformer.add_node(ConstantNode::scalar(self.predictor.bias()))?;
        let bias = transformer.output(bias, 0)?;

        let sum = transformer.add_node(BinaryOperationNode::<f64>::new(dot, bias, BinaryOperation::Add)?)?;

        let output = transformer.output(sum, 0)?;
        transformer.map_node_output(&self.output_elements(id, 0)?, output)?;
        let weighted = transformer.output(weighted, 0)?;
        transformer.map_node_output(&self.output_elements(id, 1)?, weighted)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::nodes::InputNode;
    use crate::core::graph::Model;
    use crate::core::refine::{refine, RefinementOptions};

    fn scenario_model() -> (Model, NodeId) {
        let mut model = Model::new();
        let input = model.add_node(InputNode::new(PortType::Real, 3)).unwrap();
        let predictor = LinearPredictor::new(vec![1.0, 2.0, 3.0], 0.5);
        let node = model
            .add_node(LinearPredictorNode::new(model.output(input, 0).unwrap(), predictor).unwrap())
            .unwrap();
        (model, node)
    }

    #[test]
    fn test_compute_both_outputs() {
        let (model, node) = scenario_model();
        let mut evaluator = model.evaluator();
        evaluator
            .bind_all_inputs(PortValue::Real(vec![1.0, 1.0, 1.0]))
            .unwrap();

        assert_eq!(
            evaluator.compute_output(node.output(0)).unwrap(),
            PortValue::Real(vec![6.5])
        );
        assert_eq!(
            evaluator.compute_output(node.output(1)).unwrap(),
            PortValue::Real(vec![1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn test_refine_replaces_node_with_primitives() {
        let (model, node) = scenario_model();
        let refinement = refine(&model, &RefinementOptions::default()).unwrap();

        assert!(refinement.converged);
        assert_eq!(refinement.passes, 1);
        // input, weights, dot, multiply, bias, add
        assert_eq!(refinement.model.len(), 6);
        assert!(refinement
            .model
            .nodes()
            .all(|(_, n)| n.runtime_type_name() != LinearPredictorNode::type_name()));

        let sum = refinement.corresponding_node(node).unwrap();
        assert_eq!(
            refinement.model.node(sum).unwrap().runtime_type_name(),
            "BinaryOperationNode<real>"
        );
    }

    #[test]
    fn test_dimension_must_match_input() {
        let mut model = Model::new();
        let input = model.add_node(InputNode::new(PortType::Real, 2)).unwrap();
        let predictor = LinearPredictor::new(vec![1.0, 2.0, 3.0], 0.0);
        let err = LinearPredictorNode::new(model.output(input, 0).unwrap(), predictor).unwrap_err();
        assert!(matches!(err, IrError::DimensionMismatch { .. }));
    }
}
