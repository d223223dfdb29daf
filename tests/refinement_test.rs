use pipeline_ir::app::math::BinaryOperation;
use pipeline_ir::app::nodes::{BinaryOperationNode, ConstantNode, DotProductNode, InputNode, LinearPredictorNode};
use pipeline_ir::app::pipelines::build_linear_predictor_model;
use pipeline_ir::app::predictors::LinearPredictor;
use pipeline_ir::core::archive::{Archivable, Unarchiver};
use pipeline_ir::core::description::{Describable, ObjectDescription};
use pipeline_ir::core::refine::{refine, RefinementOptions};
use pipeline_ir::core::{Model, ModelTransformer, Node};
use pipeline_ir::domain::model::{InputPort, NodeId, OutputPort, PortElements, PortRange, PortType, PortValue};
use pipeline_ir::{IrError, Result};
use proptest::prelude::*;

fn scenario() -> (Model, NodeId) {
    build_linear_predictor_model(LinearPredictor::new(vec![1.0, 2.0, 3.0], 0.5)).unwrap()
}

fn evaluate_outputs(model: &Model, targets: &[PortElements], inputs: &[f64]) -> Vec<PortValue> {
    let mut evaluator = model.evaluator();
    evaluator
        .bind_all_inputs(PortValue::Real(inputs.to_vec()))
        .unwrap();
    targets
        .iter()
        .map(|t| evaluator.compute(t).unwrap())
        .collect()
}

#[test]
fn test_linear_predictor_scenario_before_and_after_refinement() {
    let (model, node) = scenario();
    let original_targets = vec![model.output(node, 0).unwrap(), model.output(node, 1).unwrap()];
    let before = evaluate_outputs(&model, &original_targets, &[1.0, 1.0, 1.0]);
    assert_eq!(before[0], PortValue::Real(vec![6.5]));
    assert_eq!(before[1], PortValue::Real(vec![1.0, 2.0, 3.0]));

    let refinement = refine(&model, &RefinementOptions::default()).unwrap();
    let refined_targets = vec![
        refinement.corresponding_outputs(node.output(0)).unwrap(),
        refinement.corresponding_outputs(node.output(1)).unwrap(),
    ];
    let after = evaluate_outputs(&refinement.model, &refined_targets, &[1.0, 1.0, 1.0]);
    assert_eq!(after, before);
}

#[test]
fn test_refined_model_contains_only_primitive_nodes() {
    let (model, _) = scenario();
    let refinement = refine(&model, &RefinementOptions::default()).unwrap();

    let kinds: Vec<String> = refinement
        .model
        .nodes()
        .map(|(_, n)| n.runtime_type_name().to_string())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "InputNode",
            "ConstantNode<real>",
            "DotProductNode<real>",
            "BinaryOperationNode<real>",
            "ConstantNode<real>",
            "BinaryOperationNode<real>",
        ]
    );
    assert!(refinement.model.validate().is_ok());
}

#[test]
fn test_refining_primitive_model_is_fixed_point() {
    let mut model = Model::new();
    let a = model.add_node(ConstantNode::new(vec![1.0, 2.0])).unwrap();
    let b = model.add_node(ConstantNode::new(vec![3.0, 4.0])).unwrap();
    let sum = model
        .add_node(
            BinaryOperationNode::<f64>::new(
                model.output(a, 0).unwrap(),
                model.output(b, 0).unwrap(),
                BinaryOperation::Add,
            )
            .unwrap(),
        )
        .unwrap();

    let refinement = refine(&model, &RefinementOptions::default()).unwrap();
    assert!(refinement.converged);
    assert_eq!(refinement.passes, 0);
    assert_eq!(refinement.model.len(), model.len());

    let target = refinement.corresponding_outputs(sum.output(0)).unwrap();
    let value = refinement.model.evaluator().compute(&target).unwrap();
    assert_eq!(value, PortValue::Real(vec![4.0, 6.0]));
}

#[test]
fn test_copy_preserves_nodes_and_descriptions() {
    let (model, _) = scenario();
    let copy = ModelTransformer::new().copy_model(&model).unwrap();

    assert_eq!(copy.len(), model.len());
    for ((_, original), (_, copied)) in model.nodes().zip(copy.nodes()) {
        assert_eq!(original.runtime_type_name(), copied.runtime_type_name());
        assert_eq!(original.description().unwrap(), copied.description().unwrap());
    }
    // 來源模型不受影響
    assert_eq!(model.len(), 2);
}

#[test]
fn test_max_passes_limits_refinement() {
    let (model, _) = scenario();
    let refinement = refine(&model, &RefinementOptions { max_passes: 0 }).unwrap();
    assert_eq!(refinement.passes, 0);
    assert!(!refinement.converged);
    assert_eq!(refinement.model.len(), model.len());
}

#[test]
fn test_partial_range_inputs_survive_refinement() {
    let mut model = Model::new();
    let input = model.add_node(InputNode::new(PortType::Real, 4)).unwrap();
    let tail = model.output(input, 0).unwrap().slice(1, 3).unwrap();
    let node = model
        .add_node(LinearPredictorNode::new(tail, LinearPredictor::new(vec![1.0, 1.0, 1.0], 0.0)).unwrap())
        .unwrap();

    let refinement = refine(&model, &RefinementOptions::default()).unwrap();
    let target = refinement.corresponding_outputs(node.output(0)).unwrap();
    let values = evaluate_outputs(&refinement.model, &[target], &[100.0, 1.0, 2.0, 3.0]);
    assert_eq!(values[0], PortValue::Real(vec![6.0]));
}

#[test]
fn test_reference_to_later_node_is_cyclic() {
    let mut model = Model::new();
    model.add_node(ConstantNode::new(vec![1.0])).unwrap();

    let forward = PortElements::from(PortRange {
        node: NodeId(3),
        output: 0,
        port_type: PortType::Real,
        start: 0,
        size: 1,
    });
    let node = BinaryOperationNode::<f64>::new(forward.clone(), forward, BinaryOperation::Add).unwrap();
    let err = model.add_node(node).unwrap_err();
    assert!(matches!(err, IrError::CyclicReference { node: 1, referenced: 3 }));
}

#[test]
fn test_connection_checks() {
    let mut model = Model::new();
    let ints = model.add_node(ConstantNode::new(vec![1_i64, 2])).unwrap();
    let reals = model.add_node(ConstantNode::new(vec![1.0, 2.0, 3.0])).unwrap();

    let err = DotProductNode::<f64>::new(model.output(ints, 0).unwrap(), model.output(reals, 0).unwrap())
        .unwrap_err();
    assert!(matches!(err, IrError::DimensionMismatch { .. } | IrError::TypeMismatch { .. }));

    let err = BinaryOperationNode::<bool>::new(
        PortElements::default(),
        PortElements::default(),
        BinaryOperation::Add,
    )
    .unwrap_err();
    assert!(matches!(err, IrError::TypeMismatch { .. }));

    // 超出輸出範圍的引用
    let out_of_range = PortElements::from(PortRange {
        node: reals,
        output: 0,
        port_type: PortType::Real,
        start: 2,
        size: 2,
    });
    let node = DotProductNode::<f64>::new(out_of_range.clone(), out_of_range).unwrap();
    assert!(matches!(model.add_node(node), Err(IrError::DimensionMismatch { .. })));
}

#[test]
fn test_evaluation_is_pull_based_and_requires_bound_inputs() {
    let (mut model, _) = scenario();
    let unused = model.add_node(ConstantNode::new(vec![7.0])).unwrap();

    let mut evaluator = model.evaluator();
    assert_eq!(
        evaluator.compute_output(unused.output(0)).unwrap(),
        PortValue::Real(vec![7.0])
    );
    assert_eq!(evaluator.evaluated_nodes(), 1);

    let err = evaluator.compute_output(NodeId(1).output(0)).unwrap_err();
    assert!(matches!(err, IrError::UnboundInput { node: 0 }));

    let err = evaluator
        .bind_all_inputs(PortValue::Real(vec![1.0]))
        .unwrap_err();
    assert!(matches!(err, IrError::DimensionMismatch { .. }));
    let err = evaluator.bind_input(unused, PortValue::Real(vec![1.0])).unwrap_err();
    assert!(matches!(err, IrError::TypeMismatch { .. }));
}

#[test]
fn test_sink_outputs() {
    let (model, node) = scenario();
    assert_eq!(model.sink_outputs(), vec![node.output(0), node.output(1)]);
    assert_eq!(model.input_nodes(), vec![NodeId(0)]);
    assert!(model.output_named(node, "weightedElements").is_ok());
    assert!(matches!(
        model.output_named(node, "missing"),
        Err(IrError::NotFound { .. })
    ));
}

#[test]
fn test_conflicting_output_mapping_is_rejected() {
    let mut source = Model::new();
    let c = source.add_node(ConstantNode::new(vec![1.0])).unwrap();
    let old = source.output(c, 0).unwrap();

    let mut transformer = ModelTransformer::new();
    let first = transformer.add_node(ConstantNode::new(vec![1.0])).unwrap();
    let second = transformer.add_node(ConstantNode::new(vec![2.0])).unwrap();

    let first = transformer.output(first, 0).unwrap();
    transformer.map_node_output(&old, first.clone()).unwrap();
    // 相同目標可重複對應
    transformer.map_node_output(&old, first).unwrap();

    let second = transformer.output(second, 0).unwrap();
    let err = transformer.map_node_output(&old, second).unwrap_err();
    assert!(matches!(err, IrError::Transform { .. }));
}

/// Node whose refinement adds a node and then fails.
#[derive(Debug, Default)]
struct BrokenRefineNode {
    inner: ConstantNode<f64>,
}

impl Describable for BrokenRefineNode {
    fn type_name() -> &'static str {
        "BrokenRefineNode"
    }

    fn type_description() -> ObjectDescription {
        ObjectDescription::for_type::<Self>("Test node")
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        Ok(Self::type_description())
    }
}

impl Archivable for BrokenRefineNode {
    fn read_from_archive(&mut self, _unarchiver: &Unarchiver<'_>) -> Result<()> {
        Ok(())
    }
}

impl Node for BrokenRefineNode {
    fn input_ports(&self) -> Vec<&InputPort> {
        Vec::new()
    }

    fn output_ports(&self) -> &[OutputPort] {
        self.inner.output_ports()
    }

    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        self.inner.compute(inputs)
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        self.inner.copy(id, transformer)
    }

    fn refine(&self, _id: NodeId, transformer: &mut ModelTransformer) -> Result<bool> {
        transformer.add_node(ConstantNode::new(vec![0.0]))?;
        Err(IrError::transform("refinement not supported"))
    }
}

#[test]
fn test_failed_refinement_is_rolled_back_and_copied() {
    let mut model = Model::new();
    let node = model
        .add_node(BrokenRefineNode {
            inner: ConstantNode::new(vec![4.0, 5.0]),
        })
        .unwrap();

    let refinement = refine(&model, &RefinementOptions::default()).unwrap();
    assert!(refinement.converged);
    assert_eq!(refinement.passes, 0);
    assert_eq!(refinement.model.len(), 1);

    let target = refinement.corresponding_outputs(node.output(0)).unwrap();
    assert_eq!(
        refinement.model.evaluator().compute(&target).unwrap(),
        PortValue::Real(vec![4.0, 5.0])
    );
}

/// Node that forgets to map its output when copied.
#[derive(Debug, Default)]
struct UnmappedNode {
    inner: ConstantNode<f64>,
}

impl Describable for UnmappedNode {
    fn type_name() -> &'static str {
        "UnmappedNode"
    }

    fn type_description() -> ObjectDescription {
        ObjectDescription::for_type::<Self>("Test node")
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        Ok(Self::type_description())
    }
}

impl Archivable for UnmappedNode {
    fn read_from_archive(&mut self, _unarchiver: &Unarchiver<'_>) -> Result<()> {
        Ok(())
    }
}

impl Node for UnmappedNode {
    fn input_ports(&self) -> Vec<&InputPort> {
        Vec::new()
    }

    fn output_ports(&self) -> &[OutputPort] {
        self.inner.output_ports()
    }

    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        self.inner.compute(inputs)
    }

    fn copy(&self, _id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        transformer.add_node(ConstantNode::new(vec![0.0]))?;
        Ok(())
    }
}

#[test]
fn test_unmapped_output_fails_the_pass() {
    let mut model = Model::new();
    model
        .add_node(UnmappedNode {
            inner: ConstantNode::new(vec![1.0]),
        })
        .unwrap();

    let err = ModelTransformer::new().copy_model(&model).unwrap_err();
    assert!(matches!(err, IrError::Transform { .. }));
}

/// Node that maps only the first two elements of its output.
#[derive(Debug, Default)]
struct PrefixMappedNode {
    inner: ConstantNode<f64>,
}

impl Describable for PrefixMappedNode {
    fn type_name() -> &'static str {
        "PrefixMappedNode"
    }

    fn type_description() -> ObjectDescription {
        ObjectDescription::for_type::<Self>("Test node")
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        Ok(Self::type_description())
    }
}

impl Archivable for PrefixMappedNode {
    fn read_from_archive(&mut self, _unarchiver: &Unarchiver<'_>) -> Result<()> {
        Ok(())
    }
}

impl Node for PrefixMappedNode {
    fn input_ports(&self) -> Vec<&InputPort> {
        Vec::new()
    }

    fn output_ports(&self) -> &[OutputPort] {
        self.inner.output_ports()
    }

    fn compute(&self, inputs: &[PortValue]) -> Result<Vec<PortValue>> {
        self.inner.compute(inputs)
    }

    fn copy(&self, id: NodeId, transformer: &mut ModelTransformer) -> Result<()> {
        let prefix = transformer.add_node(ConstantNode::new(vec![1.0, 2.0]))?;
        let prefix = transformer.output(prefix, 0)?;
        let old = self.output_elements(id, 0)?.slice(0, 2)?;
        transformer.map_node_output(&old, prefix)
    }
}

#[test]
fn test_partial_output_mapping_is_rejected() {
    let mut model = Model::new();
    model
        .add_node(PrefixMappedNode {
            inner: ConstantNode::new(vec![1.0, 2.0, 3.0]),
        })
        .unwrap();

    let err = ModelTransformer::new().copy_model(&model).unwrap_err();
    assert!(matches!(err, IrError::Transform { .. }));
}

#[test]
fn test_deep_chain_evaluates_without_recursion() {
    const DEPTH: usize = 10_000;

    let mut model = Model::new();
    let input = model.add_node(InputNode::new(PortType::Real, 1)).unwrap();
    let one = model.add_node(ConstantNode::scalar(1.0)).unwrap();
    let one = model.output(one, 0).unwrap();

    let mut last = model.output(input, 0).unwrap();
    for _ in 0..DEPTH {
        let id = model
            .add_node(BinaryOperationNode::<f64>::new(last, one.clone(), BinaryOperation::Add).unwrap())
            .unwrap();
        last = model.output(id, 0).unwrap();
    }

    let mut evaluator = model.evaluator();
    evaluator.bind_all_inputs(PortValue::Real(vec![0.5])).unwrap();
    assert_eq!(
        evaluator.compute(&last).unwrap(),
        PortValue::Real(vec![DEPTH as f64 + 0.5])
    );
    assert_eq!(evaluator.evaluated_nodes(), DEPTH + 2);

    // 第二次取值只讀快取
    assert_eq!(
        evaluator.compute(&last).unwrap(),
        PortValue::Real(vec![DEPTH as f64 + 0.5])
    );

    let refinement = refine(&model, &RefinementOptions::default()).unwrap();
    assert_eq!(refinement.passes, 0);
    assert_eq!(refinement.model.len(), model.len());
}

proptest! {
    #[test]
    fn prop_refinement_preserves_outputs(
        (weights, inputs) in (1usize..8).prop_flat_map(|n| (
            prop::collection::vec(-100.0f64..100.0, n),
            prop::collection::vec(-100.0f64..100.0, n),
        )),
        bias in -10.0f64..10.0,
    ) {
        let (model, node) = build_linear_predictor_model(LinearPredictor::new(weights, bias)).unwrap();
        let original = vec![model.output(node, 0).unwrap(), model.output(node, 1).unwrap()];
        let before = evaluate_outputs(&model, &original, &inputs);

        let refinement = refine(&model, &RefinementOptions::default()).unwrap();
        prop_assert!(refinement.converged);
        let refined = vec![
            refinement.corresponding_outputs(node.output(0)).unwrap(),
            refinement.corresponding_outputs(node.output(1)).unwrap(),
        ];
        let after = evaluate_outputs(&refinement.model, &refined, &inputs);
        prop_assert_eq!(after, before);
    }
}
