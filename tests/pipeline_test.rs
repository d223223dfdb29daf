use pipeline_ir::app::nodes::builtin_context;
use pipeline_ir::core::archive::unarchive;
use pipeline_ir::core::description::Describable;
use pipeline_ir::core::Model;
use pipeline_ir::domain::ports::ArchiveFormat;
use pipeline_ir::{ArchivePipeline, CliConfig, IrEngine, JsonArchive, LocalStorage};
use tempfile::TempDir;

fn config(output_path: &str) -> CliConfig {
    CliConfig {
        model: None,
        output_path: output_path.to_string(),
        refine: true,
        max_passes: 8,
        verify: true,
        inputs: vec![1.0, 1.0, 1.0],
        weights: vec![1.0, 2.0, 3.0],
        bias: 0.5,
        describe: false,
        verbose: false,
        log_json: false,
    }
}

fn read_report(temp_dir: &TempDir) -> serde_json::Value {
    let data = std::fs::read(temp_dir.path().join("out/evaluation.json")).unwrap();
    serde_json::from_slice(&data).unwrap()
}

#[test]
fn test_end_to_end_refine_and_evaluate() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());
    let engine = IrEngine::new(ArchivePipeline::new(storage, config("out")));

    let output_path = engine.run().unwrap();
    assert_eq!(output_path, "out/model.json");
    assert!(temp_dir.path().join("out/model.json").exists());

    let report = read_report(&temp_dir);
    assert_eq!(report["node_count"], 6);
    assert_eq!(report["passes"], 1);
    assert_eq!(report["converged"], true);
    assert_eq!(report["outputs"][0]["name"], "LinearPredictorNode[1].output");
    assert_eq!(
        report["outputs"][0]["values"],
        serde_json::json!({"type": "real", "values": [6.5]})
    );
    assert_eq!(
        report["outputs"][1]["values"]["values"],
        serde_json::json!([1.0, 2.0, 3.0])
    );

    // 寫出的模型只含基本節點
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());
    let root = JsonArchive::pretty().load(&storage, "out/model.json").unwrap();
    let model: Model = unarchive(&root, &builtin_context()).unwrap();
    assert_eq!(model.len(), 6);
    assert!(model
        .nodes()
        .all(|(_, node)| node.runtime_type_name() != "LinearPredictorNode"));
}

#[test]
fn test_refined_archive_can_be_reloaded_and_rerun() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().to_string_lossy().to_string();

    IrEngine::new(ArchivePipeline::new(LocalStorage::new(base.clone()), config("first")))
        .run()
        .unwrap();

    let mut second = config("out");
    second.model = Some("first/model.json".to_string());
    second.inputs = vec![2.0, 0.0, -1.0];
    IrEngine::new(ArchivePipeline::new(LocalStorage::new(base), second))
        .run()
        .unwrap();

    let report = read_report(&temp_dir);
    // 已經是基本節點，不需要再細化
    assert_eq!(report["passes"], 0);
    let outputs = report["outputs"].as_array().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0]["values"]["values"], serde_json::json!([2.0, 0.0, -3.0]));
    assert_eq!(outputs[1]["values"]["values"], serde_json::json!([-0.5]));
}

#[test]
fn test_without_refinement_and_without_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());
    let mut config = config("out");
    config.refine = false;
    config.verify = false;
    config.inputs = Vec::new();

    IrEngine::new(ArchivePipeline::new(storage, config)).run().unwrap();

    let report = read_report(&temp_dir);
    assert_eq!(report["node_count"], 2);
    assert_eq!(report["passes"], 0);
    assert!(report["outputs"].as_array().unwrap().is_empty());
}

#[test]
fn test_wrong_input_length_fails() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());
    let mut config = config("out");
    config.inputs = vec![1.0];

    let err = IrEngine::new(ArchivePipeline::new(storage, config)).run().unwrap_err();
    assert!(matches!(err, pipeline_ir::IrError::DimensionMismatch { .. }));
    assert!(!temp_dir.path().join("out/model.json").exists());
}

#[test]
fn test_missing_model_archive_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());
    let mut config = config("out");
    config.model = Some("missing.json".to_string());

    let err = IrEngine::new(ArchivePipeline::new(storage, config)).run().unwrap_err();
    assert!(matches!(err, pipeline_ir::IrError::IoError(_)));
    assert_eq!(err.severity(), pipeline_ir::utils::error::ErrorSeverity::Critical);
}
