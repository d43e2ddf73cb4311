//! Chart metadata (`Chart.yaml`).

use forge_manifest::{Mapping, Value};
use serde::{Deserialize, Serialize};

/// Chart type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Application,
    Library,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Application => "application",
            ChartType::Library => "library",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A chart this chart depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    pub version: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Package metadata written to the metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default, rename = "type")]
    pub chart_type: Option<ChartType>,
    #[serde(default)]
    pub kube_version: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

fn default_api_version() -> String {
    "v2".to_string()
}

impl ChartMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            app_version: None,
            chart_type: None,
            kube_version: None,
            keywords: Vec::new(),
            home: None,
            sources: Vec::new(),
            maintainers: Vec::new(),
            icon: None,
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    pub fn with_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = Some(chart_type);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_maintainer(mut self, maintainer: Maintainer) -> Self {
        self.maintainers.push(maintainer);
        self
    }

    pub fn with_dependency(mut self, dependency: ChartDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Record tree in the field order Helm documents, without empty fields.
    pub fn to_value(&self) -> Value {
        let mut m = Mapping::new();
        m.insert("apiVersion", self.api_version.as_str());
        m.insert("name", self.name.as_str());
        m.insert("version", self.version.as_str());
        insert_opt(&mut m, "kubeVersion", &self.kube_version);
        if !self.description.is_empty() {
            m.insert("description", self.description.as_str());
        }
        if let Some(chart_type) = self.chart_type {
            m.insert("type", chart_type.as_str());
        }
        insert_list(&mut m, "keywords", &self.keywords);
        insert_opt(&mut m, "home", &self.home);
        insert_list(&mut m, "sources", &self.sources);

        if !self.dependencies.is_empty() {
            let deps = self.dependencies.iter().map(dependency_value).collect::<Vec<_>>();
            m.insert("dependencies", Value::Sequence(deps));
        }
        if !self.maintainers.is_empty() {
            let maintainers = self
                .maintainers
                .iter()
                .map(|mt| {
                    let mut entry = Mapping::new();
                    entry.insert("name", mt.name.as_str());
                    insert_opt(&mut entry, "email", &mt.email);
                    insert_opt(&mut entry, "url", &mt.url);
                    Value::Mapping(entry)
                })
                .collect::<Vec<_>>();
            m.insert("maintainers", Value::Sequence(maintainers));
        }

        insert_opt(&mut m, "icon", &self.icon);
        insert_opt(&mut m, "appVersion", &self.app_version);
        Value::Mapping(m)
    }
}

fn dependency_value(dep: &ChartDependency) -> Value {
    let mut m = Mapping::new();
    m.insert("name", dep.name.as_str());
    m.insert("version", dep.version.as_str());
    m.insert("repository", dep.repository.as_str());
    insert_opt(&mut m, "condition", &dep.condition);
    insert_list(&mut m, "tags", &dep.tags);
    insert_opt(&mut m, "alias", &dep.alias);
    Value::Mapping(m)
}

fn insert_opt(m: &mut Mapping, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        m.insert(key, v);
    }
}

fn insert_list(m: &mut Mapping, key: &str, values: &[String]) {
    if !values.is_empty() {
        m.insert(key, values.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_manifest::to_yaml_string;

    #[test]
    fn test_minimal_metadata() {
        let yaml = to_yaml_string(&ChartMetadata::new("demo", "1.0.0").to_value());
        assert_eq!(yaml, "apiVersion: v2\nname: demo\nversion: 1.0.0\n");
    }

    #[test]
    fn test_full_metadata_order_and_quoting() {
        let metadata = ChartMetadata::new("demo", "0.1.0")
            .with_description("A demo chart")
            .with_type(ChartType::Application)
            .with_keyword("web")
            .with_app_version("1.16")
            .with_dependency(ChartDependency {
                name: "redis".to_string(),
                version: "~17.0".to_string(),
                repository: "https://charts.bitnami.com/bitnami".to_string(),
                condition: Some("redis.enabled".to_string()),
                tags: vec![],
                alias: None,
            });

        let yaml = to_yaml_string(&metadata.to_value());
        let keys: Vec<&str> = yaml
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('-'))
            .filter_map(|l| l.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec!["apiVersion", "name", "version", "description", "type", "keywords", "dependencies", "appVersion"]
        );

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["appVersion"].as_str(), Some("1.16"));
        assert_eq!(parsed["dependencies"][0]["condition"].as_str(), Some("redis.enabled"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let metadata: ChartMetadata = serde_yaml::from_str(
            "name: demo\nversion: 1.0.0\nappVersion: \"2.0\"\ntype: library\nkubeVersion: \">=1.25\"\n",
        )
        .unwrap();

        assert_eq!(metadata.api_version, "v2");
        assert_eq!(metadata.app_version.as_deref(), Some("2.0"));
        assert_eq!(metadata.chart_type, Some(ChartType::Library));
        assert_eq!(metadata.kube_version.as_deref(), Some(">=1.25"));
    }
}
