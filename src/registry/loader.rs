//! Registry file loading (YAML or JSON).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{RegistryError, ToolRegistry};
use crate::types::ToolDescriptor;

/// On-disk registry document: one integration and its ordered tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub integration: String,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// Load and validate one registry file. `.json` files are parsed as JSON,
/// everything else as YAML.
pub fn load_file(path: impl AsRef<Path>) -> Result<(String, ToolRegistry), RegistryError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let file: RegistryFile = if is_json {
        serde_json::from_str(&content).map_err(|e| RegistryError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| RegistryError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
    };

    let registry = ToolRegistry::new(file.tools)?;
    tracing::debug!(
        integration = %file.integration,
        tools = registry.len(),
        path = %path.display(),
        "Loaded tool registry"
    );
    Ok((file.integration, registry))
}

/// Load every `.yaml`/`.yml`/`.json` file of a directory, sorted by file name.
/// Each file reports its own outcome so one bad file does not hide the others.
pub fn load_dir(
    dir: impl AsRef<Path>,
) -> Result<Vec<(PathBuf, Result<(String, ToolRegistry), RegistryError>)>, RegistryError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| RegistryError::Load {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext, "yaml" | "yml" | "json"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|p| {
            let result = load_file(&p);
            (p, result)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_yaml_and_json_documents() {
        let dir = std::env::temp_dir().join(format!("ai-lib-tools-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("a.yaml"),
            "integration: jira\ntools:\n  - name: fetch\n    method: GET\n    url: /issue/{{issue}}\n    input_schema:\n      issue: {type: string, required: true}\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("b.json"),
            r#"{"integration":"qb","tools":[{"name":"bad","method":"GET","url_template":"/x/{{missing}}"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let results = load_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(results.len(), 2);
        let (name, reg) = results[0].1.as_ref().unwrap();
        assert_eq!(name, "jira");
        assert!(reg.get("fetch").is_some());
        assert!(matches!(
            results[1].1,
            Err(RegistryError::InvalidDescriptor { .. })
        ));
    }
}
