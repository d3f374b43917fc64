use std::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use tracing::debug;
use font_core::{AppConfig, FontError, FontResult};

/// Environment variable that takes precedence over `builder.api_key`
pub const API_KEY_ENV: &str = "GOOGLE_FONTS_API_KEY";

pub fn get_config_path() -> FontResult<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "font-alternatives", "font-alternatives")
        .ok_or_else(|| FontError::Config("Could not determine config directory".to_string()))?;

    Ok(project_dirs.config_dir().join("config.toml"))
}

/// Configuration from the platform config directory, defaults when absent
pub fn load_config() -> FontResult<AppConfig> {
    load_config_from(get_config_path()?)
}

pub fn load_config_from<P: AsRef<Path>>(path: P) -> FontResult<AppConfig> {
    let path = path.as_ref();

    let config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)
            .map_err(|e| FontError::Config(format!("{}: {}", path.display(), e)))?
    } else {
        // No config file exists, use defaults
        debug!(path = %path.display(), "no config file, using defaults");
        AppConfig::default()
    };

    Ok(with_api_key_override(config, std::env::var(API_KEY_ENV).ok()))
}

/// Replace the configured listing key with `key` when it is set and non-blank
pub fn with_api_key_override(mut config: AppConfig, key: Option<String>) -> AppConfig {
    if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
        config.builder.api_key = Some(key);
    }
    config
}

pub fn save_config(config: &AppConfig) -> FontResult<PathBuf> {
    let config_path = get_config_path()?;
    save_config_to(config, &config_path)?;
    Ok(config_path)
}

pub fn save_config_to<P: AsRef<Path>>(config: &AppConfig, path: P) -> FontResult<()> {
    let path = path.as_ref();

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let config_str = toml::to_string_pretty(config)
        .map_err(|e| FontError::Config(format!("failed to serialize config: {}", e)))?;
    fs::write(path, config_str)?;

    Ok(())
}

/// Human-readable dump of a configuration; the API key is masked
pub fn render_config(config: &AppConfig) -> String {
    let rule = "=".repeat(50);
    let matcher = &config.matcher;
    let builder = &config.builder;
    let api_key = match &builder.api_key {
        Some(_) => "set",
        None => "not set",
    };

    let mut out = String::new();
    out.push_str(&format!("{}\nCURRENT CONFIGURATION\n{}\n", rule, rule));

    out.push_str("\nMatcher:\n");
    out.push_str(&format!("   Catalog: {}\n", matcher.catalog_path.display()));
    out.push_str(&format!("   Top-K neighbours: {}\n", matcher.top_k));
    out.push_str(&format!("   Name hit supplements: {}\n", matcher.supplement_neighbors));
    out.push_str(&format!(
        "   Category fallback: {} results at {}%\n",
        matcher.category_fallback_limit, matcher.category_fallback_similarity
    ));
    out.push_str(&format!("   Fetch timeout: {}ms\n", matcher.fetch_timeout_ms));
    out.push_str(&format!("   Extraction workers: {}\n", matcher.max_concurrent_extractions));
    out.push_str(&format!("   Specimen URL: {}\n", matcher.specimen_url_template));

    out.push_str("\nCatalog builder:\n");
    out.push_str(&format!("   Listing endpoint: {}\n", builder.listing_endpoint));
    out.push_str(&format!("   API key: {}\n", api_key));
    out.push_str(&format!("   Download delay: {}ms\n", builder.download_delay_ms));
    out.push_str(&format!("   Checkpoint every: {} fonts\n", builder.checkpoint_every));
    out.push_str(&format!("   Output: {}\n", builder.output_path.display()));
    out.push_str(&format!("   Checkpoint: {}\n", builder.checkpoint_path.display()));
    out.push_str(&format!("   Request timeout: {}s\n", builder.request_timeout_secs));

    out.push_str(&format!("\n{}\n", rule));
    out
}

pub fn show_current_config() -> FontResult<()> {
    let config = load_config()?;
    print!("{}", render_config(&config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(dir.path().join("config.toml")).unwrap();
        assert_eq!(config.matcher, AppConfig::default().matcher);
        assert_eq!(config.builder.download_delay_ms, 150);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.matcher.top_k = 8;
        config.matcher.catalog_path = PathBuf::from("/srv/fonts/catalog.json.gz");
        config.builder.checkpoint_every = 10;
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.matcher, config.matcher);
        assert_eq!(loaded.builder.checkpoint_every, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[matcher]\nfetch_timeout_ms = 1500\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.matcher.fetch_timeout_ms, 1500);
        assert_eq!(config.matcher.top_k, 6);
        assert_eq!(config.builder.checkpoint_every, 50);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[matcher\ntop_k = ").unwrap();

        assert!(matches!(load_config_from(&path), Err(FontError::Config(_))));
    }

    #[test]
    fn test_api_key_override() {
        let mut config = AppConfig::default();
        config.builder.api_key = Some("from-file".to_string());

        let kept = with_api_key_override(config.clone(), Some("  ".to_string()));
        assert_eq!(kept.builder.api_key.as_deref(), Some("from-file"));

        let replaced = with_api_key_override(config, Some("from-env".to_string()));
        assert_eq!(replaced.builder.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_render_masks_api_key() {
        let mut config = AppConfig::default();
        config.builder.api_key = Some("super-secret".to_string());
        let text = render_config(&config);
        assert!(text.contains("API key: set"));
        assert!(!text.contains("super-secret"));
        assert!(text.contains("Top-K neighbours: 6"));
    }
}
