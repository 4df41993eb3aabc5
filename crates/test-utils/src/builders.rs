#![allow(dead_code)]

use std::path::{Path, PathBuf};

use evalrun::config::{
    DisplaySection, EngineSection, LauncherConfig, PathsSection, RawLauncherConfig,
};

/// Engine configuration template with the three path fields and a
/// `[runflow]` section followed by another section.
pub const ENGINE_TEMPLATE: &str = r#"# engine configuration
[llm]
model = "gpt-4o"
temperature = 0.0

[io]
input_dir = "/placeholder/input"
output_dir = "/placeholder/output"
workspace_root = "/placeholder/workspace"

[runflow]
use_data_analysis_agent = true

[sandbox]
use_sandbox = false
"#;

/// Builder for `LauncherConfig` rooted in a (temporary) directory.
///
/// Writes nothing by itself; use [`write_templates`] to drop the template
/// files where the builder points.
pub struct LauncherConfigBuilder {
    config: RawLauncherConfig,
}

impl LauncherConfigBuilder {
    /// Settings with `database/` and `templates/` under `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            config: RawLauncherConfig {
                paths: PathsSection {
                    database_dir: root.join("database"),
                    config_template: root.join("templates/config_evaluate_property.toml"),
                    content_template: Some(root.join("templates/IC_instruction.md")),
                    materialized_name: "config_evaluate_property.toml".to_string(),
                },
                engine: EngineSection {
                    executable: PathBuf::from("/bin/sh"),
                    script: root.join("engine/run_flow.sh"),
                    config_env: "OPENMANUS_CONFIG_PATH".to_string(),
                    query_env: "EVALRUN_TEST_QUERY".to_string(),
                    timeout_secs: 30,
                    grace_period_ms: 200,
                    echo_output: false,
                    working_dir: None,
                },
                display: DisplaySection::default(),
            },
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.config.engine.timeout_secs = secs;
        self
    }

    pub fn with_grace_period_ms(mut self, ms: u64) -> Self {
        self.config.engine.grace_period_ms = ms;
        self
    }

    pub fn without_content_template(mut self) -> Self {
        self.config.paths.content_template = None;
        self
    }

    pub fn with_priority(mut self, names: &[&str]) -> Self {
        self.config.display.priority = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> LauncherConfig {
        LauncherConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Write [`ENGINE_TEMPLATE`] and a small content template where `cfg` expects
/// them.
pub fn write_templates(cfg: &LauncherConfig) {
    let config_template = &cfg.paths.config_template;
    std::fs::create_dir_all(config_template.parent().unwrap()).unwrap();
    std::fs::write(config_template, ENGINE_TEMPLATE).unwrap();

    if let Some(content) = &cfg.paths.content_template {
        std::fs::create_dir_all(content.parent().unwrap()).unwrap();
        std::fs::write(content, "# Investment Committee instructions\n").unwrap();
    }
}

/// Write an executable-by-`sh` engine script where `cfg` expects it.
pub fn write_engine_script(cfg: &LauncherConfig, body: &str) {
    let script = &cfg.engine.script;
    std::fs::create_dir_all(script.parent().unwrap()).unwrap();
    std::fs::write(script, body).unwrap();
}
