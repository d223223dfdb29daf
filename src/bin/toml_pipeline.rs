use clap::Parser;
use pipeline_ir::config::toml_config::TomlConfig;
use pipeline_ir::core::{ConfigProvider, Pipeline};
use pipeline_ir::utils::error::ErrorSeverity;
use pipeline_ir::utils::{logger, validation::Validate};
use pipeline_ir::{ArchivePipeline, IrEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-pipeline")]
#[command(about = "Pipeline IR tool with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "pipeline.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override refine.enabled from config
    #[arg(long)]
    refine: Option<bool>,

    /// Dry run - load the model and show what would be processed
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_cli_logger(args.verbose || config.verbose(), config.log_json());
    tracing::info!("Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(refine) = args.refine {
        config.refine.enabled = Some(refine);
        tracing::info!("Refinement overridden to: {}", refine);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let storage = LocalStorage::new(".".to_string());
    let pipeline = ArchivePipeline::new(storage, config);

    if args.dry_run {
        tracing::info!("DRY RUN MODE - No output will be written");
        match pipeline.extract() {
            Ok(model) => {
                println!("🔍 Model has {} nodes:", model.len());
                for (id, node) in model.nodes() {
                    println!("  {} {}", id, node.runtime_type_name());
                }
            }
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(1);
            }
        }
        return;
    }

    let engine = IrEngine::new(pipeline);
    match engine.run() {
        Ok(output_path) => {
            println!("✅ Pipeline run completed successfully!");
            println!("📁 Refined model saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "Pipeline run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    match config.model_path() {
        Some(path) => println!("  Model: {}", path),
        None => println!(
            "  Model: linear predictor, weights {:?}, bias {}",
            config.demo_weights(),
            config.demo_bias()
        ),
    }
    println!(
        "  Refine: {} (max passes {}, verify {})",
        config.refine_enabled(),
        config.max_passes(),
        config.verify_refinement()
    );
    println!("  Inputs: {:?}", config.inputs());
    println!("  Output: {}", config.output_path());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
}
