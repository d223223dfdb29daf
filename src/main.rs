use clap::Parser;
use pipeline_ir::core::Pipeline;
use pipeline_ir::utils::error::{ErrorSeverity, IrError};
use pipeline_ir::utils::{logger, validation::Validate};
use pipeline_ir::{ArchivePipeline, CliConfig, IrEngine, LocalStorage};

fn exit_code(e: &IrError) -> i32 {
    // 根據錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(e: &IrError) {
    tracing::error!(
        "Pipeline run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let code = exit_code(e);
    if code > 0 {
        std::process::exit(code);
    }
}

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose, config.log_json);

    tracing::info!("Starting pipeline-ir CLI");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let describe = config.describe;
    let storage = LocalStorage::new(".".to_string());
    let pipeline = ArchivePipeline::new(storage, config);

    if describe {
        let printed = pipeline.extract().and_then(|model| {
            let mut out = String::new();
            for (_, node) in model.nodes() {
                out.push_str(&node.description()?.to_string());
            }
            Ok(out)
        });
        match printed {
            Ok(out) => print!("{}", out),
            Err(e) => report_failure(&e),
        }
    }

    let engine = IrEngine::new(pipeline);
    match engine.run() {
        Ok(output_path) => {
            tracing::info!("Pipeline run completed");
            println!("✅ Pipeline run completed successfully!");
            println!("📁 Refined model saved to: {}", output_path);
        }
        Err(e) => report_failure(&e),
    }
}
