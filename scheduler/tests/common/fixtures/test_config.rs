//! Test configuration builder for writing config directories programmatically

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Builder for a config directory: `main.toml` plus definition files
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_config: MainConfigBuilder,
    definition_files: Vec<(String, String)>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_config: MainConfigBuilder::default(),
            definition_files: Vec::new(),
        }
    }

    /// Configure main settings
    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main_config = f(self.main_config);
        self
    }

    /// Add a definition file with raw TOML content
    pub fn with_definitions(mut self, file_stem: &str, toml: &str) -> Self {
        self.definition_files
            .push((format!("{}.toml", file_stem), toml.to_string()));
        self
    }

    /// Build and write config files to temp directory
    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        let database_path = self.temp_dir.path().join("data").join("scheduler.db");
        let main_toml = self.main_config.to_toml(&database_path);
        fs::write(config_dir.join("main.toml"), main_toml).expect("Failed to write main.toml");

        for (file_name, content) in self.definition_files {
            fs::write(config_dir.join(file_name), content)
                .expect("Failed to write definition file");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
            database_path,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
pub struct MainConfigBuilder {
    max_attempts: Option<u32>,
    retry_interval_seconds: Option<u64>,
    default_time_zone: Option<String>,
}

impl MainConfigBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn retry_interval(mut self, seconds: u64) -> Self {
        self.retry_interval_seconds = Some(seconds);
        self
    }

    pub fn default_time_zone(mut self, tz: &str) -> Self {
        self.default_time_zone = Some(tz.to_string());
        self
    }

    fn to_toml(&self, database_path: &std::path::Path) -> String {
        let mut toml = format!("database_path = \"{}\"\n", database_path.display());
        if let Some(attempts) = self.max_attempts {
            toml.push_str(&format!("max_attempts = {}\n", attempts));
        }
        if let Some(seconds) = self.retry_interval_seconds {
            toml.push_str(&format!("retry_interval_seconds = {}\n", seconds));
        }
        if let Some(tz) = &self.default_time_zone {
            toml.push_str(&format!("default_time_zone = \"{}\"\n", tz));
        }
        toml
    }
}

/// Built test configuration with temp directory
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
}

impl TestConfig {
    pub fn config_dir_string(&self) -> String {
        self.config_dir.display().to_string()
    }
}
