use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, RunError};

/// Supported request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }

    /// PUT, POST and PATCH must carry a body; the rest must not.
    pub fn requires_body(&self) -> bool {
        matches!(self, Method::Put | Method::Post | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            m @ ("TRACE" | "OPTIONS" | "CONNECT") => {
                Err(RunError::config(format!("{m} is not supported")))
            }
            m => Err(RunError::config(format!("invalid method: {m}"))),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = RunError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

/// Replace `key` with an integer drawn uniformly from `[min, max]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRule {
    pub key: String,
    pub min: i64,
    pub max: i64,
}

impl IntRule {
    pub fn new(key: impl Into<String>, min: i64, max: i64) -> Result<Self> {
        let rule = Self {
            key: key.into(),
            min,
            max,
        };
        rule.validate()?;
        Ok(rule)
    }

    fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(RunError::config("int rule key must not be empty"));
        }
        if self.min >= self.max {
            return Err(RunError::config(format!(
                "int rule {} must have a min value less than max ({} >= {})",
                self.key, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Replace `key` with one of `choices`, picked uniformly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRule {
    pub key: String,
    #[serde(rename = "values")]
    pub choices: Vec<String>,
}

impl StringRule {
    pub fn new(key: impl Into<String>, choices: Vec<String>) -> Result<Self> {
        let rule = Self {
            key: key.into(),
            choices,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn from_csv(key: impl Into<String>, choices: &str) -> Result<Self> {
        let choices = choices
            .split(',')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(key, choices)
    }

    fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(RunError::config("string rule key must not be empty"));
        }
        if self.choices.is_empty() {
            return Err(RunError::config(format!(
                "no string values specified for {}",
                self.key
            )));
        }
        Ok(())
    }
}

/// Templates and substitution rules for the URL randomizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizerConfig {
    #[serde(default)]
    pub seed: i64,
    #[serde(rename = "urls")]
    pub url_templates: Vec<String>,
    #[serde(rename = "intvals", default)]
    pub int_rules: Vec<IntRule>,
    #[serde(rename = "stringvals", default)]
    pub string_rules: Vec<StringRule>,
}

impl RandomizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url_templates.is_empty() {
            return Err(RunError::config("at least one url template is required"));
        }
        for rule in &self.int_rules {
            rule.validate()?;
        }
        for rule in &self.string_rules {
            rule.validate()?;
        }
        Ok(())
    }
}

/// Run configuration; also the on-disk JSON profile format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "requests")]
    pub request_count: u64,
    #[serde(rename = "workers")]
    pub worker_count: usize,
    #[serde(default = "default_method")]
    pub method: Method,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(flatten)]
    pub randomizer: RandomizerConfig,
    #[serde(default, with = "body_json", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
    /// Read the body from this file during validation
    #[serde(rename = "file", default, skip_serializing_if = "Option::is_none")]
    pub body_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Job queue bound; defaults to twice the worker count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,
}

/// Largest bound a tokio channel accepts
pub const MAX_QUEUE_DEPTH: usize = tokio::sync::Semaphore::MAX_PERMITS;

fn default_method() -> Method {
    Method::Get
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            request_count: 1024,
            worker_count: 4,
            method: Method::Get,
            headers: HashMap::new(),
            randomizer: RandomizerConfig::default(),
            body: None,
            body_file: None,
            timeout_secs: default_timeout_secs(),
            queue_depth: None,
        }
    }
}

impl RunConfig {
    /// Check every setting and resolve the body file
    pub fn validate(mut self) -> Result<ValidatedConfig> {
        if self.request_count == 0 {
            return Err(RunError::config("request count must be greater than zero"));
        }
        if self.worker_count == 0 {
            return Err(RunError::config("worker count must be greater than zero"));
        }
        if self.timeout_secs == 0 {
            return Err(RunError::config("timeout must be greater than zero"));
        }
        if self.queue_depth == Some(0) {
            return Err(RunError::config("queue depth must be greater than zero"));
        }
        if self.queue_depth() > MAX_QUEUE_DEPTH {
            return Err(RunError::config(format!(
                "queue depth {} exceeds the maximum of {} (defaults to twice the worker count)",
                self.queue_depth(),
                MAX_QUEUE_DEPTH
            )));
        }

        if self.body.as_ref().is_some_and(|b| b.is_empty()) {
            self.body = None;
        }

        if self.method.requires_body() {
            match (&self.body, &self.body_file) {
                (Some(_), Some(_)) => {
                    return Err(RunError::config(format!(
                        "{} takes either a request body or a body file, not both",
                        self.method
                    )));
                }
                (None, Some(path)) => {
                    let body = fs::read(path)?;
                    if body.is_empty() {
                        return Err(RunError::config(format!(
                            "body file {} is empty",
                            path.display()
                        )));
                    }
                    self.body = Some(body);
                }
                (None, None) => {
                    return Err(RunError::config(format!(
                        "{} requires a request body",
                        self.method
                    )));
                }
                (Some(_), None) => {}
            }
        } else if self.body.is_some() || self.body_file.is_some() {
            return Err(RunError::config(format!(
                "can't specify a request body for {}",
                self.method
            )));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RunError::config(format!("invalid header name: {name:?}")))?;
            HeaderValue::from_str(value).map_err(|_| {
                RunError::config(format!("invalid value for header {name}: {value:?}"))
            })?;
        }

        self.randomizer.validate()?;
        Ok(ValidatedConfig(self))
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
            .unwrap_or_else(|| self.worker_count.saturating_mul(2))
    }

    pub fn load_profile(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_profile(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }
}

/// Output of [`RunConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig(RunConfig);

impl ValidatedConfig {
    pub fn into_inner(self) -> RunConfig {
        self.0
    }
}

impl Deref for ValidatedConfig {
    type Target = RunConfig;

    fn deref(&self) -> &RunConfig {
        &self.0
    }
}

/// Profiles store the body as text. Bytes that are not UTF-8 are written as
/// `{"base64": "..."}`; any other raw JSON value is kept as its serialized
/// form so a profile can embed the payload directly.
mod body_json {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer, de};
    use serde_json::Value;

    const BASE64_KEY: &str = "base64";

    pub fn serialize<S>(body: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let Some(bytes) = body else {
            return serializer.serialize_none();
        };
        match std::str::from_utf8(bytes) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(BASE64_KEY, &STANDARD.encode(bytes))?;
                map.end()
            }
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.into_bytes())),
            Some(Value::Object(map))
                if map.len() == 1 && map.get(BASE64_KEY).is_some_and(Value::is_string) =>
            {
                let encoded = map[BASE64_KEY].as_str().unwrap_or_default();
                STANDARD
                    .decode(encoded)
                    .map(Some)
                    .map_err(|e| de::Error::custom(format!("invalid base64 body: {e}")))
            }
            Some(other) => Ok(Some(other.to_string().into_bytes())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base(method: Method) -> RunConfig {
        RunConfig {
            request_count: 10,
            worker_count: 3,
            method,
            randomizer: RandomizerConfig {
                url_templates: vec!["http://x/{i}".to_string()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        for m in ["TRACE", "options", "CONNECT"] {
            let err = m.parse::<Method>().unwrap_err();
            assert!(err.to_string().contains("not supported"), "{err}");
        }
        assert!(
            "FETCH"
                .parse::<Method>()
                .unwrap_err()
                .to_string()
                .contains("invalid method")
        );
    }

    #[test]
    fn get_with_body_is_rejected() {
        let mut config = base(Method::Get);
        config.body = Some(b"payload".to_vec());
        assert!(matches!(config.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn post_without_body_is_rejected() {
        let config = base(Method::Post);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("POST requires a request body"));

        let mut config = base(Method::Put);
        config.body = Some(Vec::new());
        assert!(matches!(config.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn post_reads_body_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"name":"x"}"#).unwrap();

        let mut config = base(Method::Post);
        config.body_file = Some(file.path().to_path_buf());
        let config = config.validate().unwrap();
        assert_eq!(config.body.as_deref(), Some(&br#"{"name":"x"}"#[..]));
    }

    #[test]
    fn delete_with_body_file_is_rejected() {
        let mut config = base(Method::Delete);
        config.body_file = Some(PathBuf::from("/nonexistent"));
        assert!(matches!(config.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn counts_and_headers_are_checked() {
        let mut config = base(Method::Get);
        config.request_count = 0;
        assert!(config.validate().is_err());

        let mut config = base(Method::Get);
        config.worker_count = 0;
        assert!(config.validate().is_err());

        let mut config = base(Method::Get);
        config
            .headers
            .insert("Bad Header".to_string(), "v".to_string());
        assert!(config.validate().is_err());

        let mut config = base(Method::Get);
        config.randomizer.url_templates.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rules_are_checked() {
        assert!(IntRule::new("{i}", 5, 5).is_err());
        assert!(IntRule::new("", 0, 5).is_err());
        assert!(IntRule::new("{i}", -10, 10).is_ok());
        assert!(StringRule::new("{s}", Vec::new()).is_err());

        let rule = StringRule::from_csv("{s}", "items,users").unwrap();
        assert_eq!(rule.choices, vec!["items", "users"]);
        assert!(StringRule::from_csv("{s}", "").is_err());

        let mut config = base(Method::Get);
        config.randomizer.int_rules.push(IntRule {
            key: "{i}".to_string(),
            min: 9,
            max: 1,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn profile_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let mut config = base(Method::Post);
        config.body = Some(b"hello".to_vec());
        config
            .headers
            .insert("Content-Type".to_string(), "text/plain".to_string());
        config.randomizer.seed = 348547;
        config
            .randomizer
            .int_rules
            .push(IntRule::new("{i}", 1, 5).unwrap());
        config.save_profile(&path).unwrap();

        let loaded = RunConfig::load_profile(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn profile_accepts_raw_json_body() {
        let raw = r#"{
            "requests": 5,
            "workers": 2,
            "method": "post",
            "urls": ["http://localhost:8080/{s1}/{i1}/"],
            "intvals": [{"key": "{i1}", "min": 0, "max": 1000}],
            "stringvals": [{"key": "{s1}", "values": ["items", "users"]}],
            "body": {"id": 1}
        }"#;
        let config: RunConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.method, Method::Post);
        assert_eq!(config.body.as_deref(), Some(&br#"{"id":1}"#[..]));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.randomizer.string_rules[0].choices.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn oversized_queue_depth_is_rejected() {
        let mut config = base(Method::Get);
        config.queue_depth = Some(usize::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("queue depth"), "{err}");

        // The derived depth is checked as well
        let mut config = base(Method::Get);
        config.worker_count = MAX_QUEUE_DEPTH;
        assert!(matches!(config.validate(), Err(RunError::Config(_))));

        let mut config = base(Method::Get);
        config.queue_depth = Some(MAX_QUEUE_DEPTH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn binary_body_survives_profile_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let mut config = base(Method::Put);
        config.body = Some(vec![255, 0, 128, 97]);
        config.save_profile(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""base64": "/wCAYQ==""#), "{raw}");
        let loaded = RunConfig::load_profile(&path).unwrap();
        assert_eq!(loaded.body, Some(vec![255, 0, 128, 97]));
        assert_eq!(loaded, config);
    }

    #[test]
    fn bad_base64_body_fails_to_load() {
        let raw = r#"{"requests": 1, "workers": 1, "urls": ["http://x/"],
            "body": {"base64": "not base64!"}}"#;
        assert!(serde_json::from_str::<RunConfig>(raw).is_err());
    }

    #[test]
    fn validated_config_derefs_to_settings() {
        let validated = base(Method::Get).validate().unwrap();
        assert_eq!(validated.worker_count, 3);
        assert_eq!(validated.queue_depth(), 6);
        assert_eq!(validated.into_inner(), base(Method::Get));
    }
}
