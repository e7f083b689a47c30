//! Request and response contracts of the ActiveTigger API.
//!
//! Field names match the server schema exactly; they are sent and received
//! as-is. Open-ended sections of the server payload (project state
//! sub-sections, statistics, predictions) stay as [`serde_json::Value`]: the
//! client only picks named fields from them for display.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============ Auth ============

/// Response of `POST /token`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ============ Projects ============

/// Stored parameters of a project.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProjectParameters {
    #[serde(default)]
    pub project_slug: String,
    pub project_name: String,
    #[serde(default)]
    pub cols_text: Vec<String>,
    #[serde(default)]
    pub col_id: String,
    #[serde(default)]
    pub n_train: i64,
    #[serde(default)]
    pub n_test: i64,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub cols_label: Vec<String>,
    #[serde(default)]
    pub cols_context: Vec<String>,
    #[serde(default)]
    pub all_columns: Option<Vec<String>>,
    #[serde(default)]
    pub n_total: Option<i64>,
}

/// One entry of `GET /projects`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectSummary {
    pub parameters: ProjectParameters,
    #[serde(default)]
    pub user_right: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailableProjects {
    pub projects: Vec<ProjectSummary>,
}

/// Payload of `POST /projects/new`. `csv` carries the raw file content;
/// the server parses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub project_name: String,
    pub filename: String,
    pub cols_text: Vec<String>,
    pub col_id: String,
    pub n_train: i64,
    pub n_test: i64,
    pub language: String,
    pub cols_label: Vec<String>,
    pub cols_context: Vec<String>,
    pub cols_test: Vec<String>,
    pub embeddings: Vec<String>,
    pub n_skip: i64,
    pub default_scheme: Vec<String>,
    pub test: bool,
    pub clear_test: bool,
    pub random_selection: bool,
    pub csv: String,
}

impl ProjectData {
    /// Project parameters with server defaults for everything optional.
    pub fn new(project_name: &str, filename: &str, csv: String) -> Self {
        Self {
            project_name: project_name.to_string(),
            filename: filename.to_string(),
            cols_text: Vec::new(),
            col_id: String::new(),
            n_train: 0,
            n_test: 0,
            language: "fr".to_string(),
            cols_label: Vec::new(),
            cols_context: Vec::new(),
            cols_test: Vec::new(),
            embeddings: Vec::new(),
            n_skip: 0,
            default_scheme: Vec::new(),
            test: false,
            clear_test: false,
            random_selection: false,
            csv,
        }
    }
}

/// Payload of `POST /projects/update`. Unset fields are left unchanged by
/// the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols_text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols_context: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_n_train: Option<i64>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Payload of `POST /projects/testset/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSetData {
    pub col_text: String,
    pub col_id: String,
    pub n_test: i64,
    pub filename: String,
    pub csv: String,
    #[serde(default)]
    pub col_label: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
}

/// Response of `GET /projects/auth`: user name to role.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectAuths {
    pub auth: BTreeMap<String, String>,
}

/// Response of `GET /projects/{project_slug}`.
///
/// Each section (`schemes`, `features`, `simplemodel`, `bertmodels`,
/// `projections`) is an object holding at least an `available` entry and,
/// while a job runs, a `training` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectState {
    pub params: ProjectParameters,
    #[serde(default)]
    pub users: Value,
    #[serde(default)]
    pub next: Value,
    #[serde(default)]
    pub schemes: Value,
    #[serde(default)]
    pub features: Value,
    #[serde(default)]
    pub simplemodel: Value,
    #[serde(default)]
    pub bertmodels: Value,
    #[serde(default)]
    pub projections: Value,
    #[serde(default)]
    pub generations: Value,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub memory: f64,
}

/// Sections of [`ProjectState`] that can host a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSection {
    Features,
    SimpleModel,
    BertModels,
    Projections,
}

impl StateSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateSection::Features => "features",
            StateSection::SimpleModel => "simplemodel",
            StateSection::BertModels => "bertmodels",
            StateSection::Projections => "projections",
        }
    }
}

impl ProjectState {
    fn section(&self, section: StateSection) -> &Value {
        match section {
            StateSection::Features => &self.features,
            StateSection::SimpleModel => &self.simplemodel,
            StateSection::BertModels => &self.bertmodels,
            StateSection::Projections => &self.projections,
        }
    }

    /// Scheme names listed under `schemes.available`.
    pub fn available_schemes(&self) -> Vec<String> {
        keys_or_items(&self.schemes["available"])
    }

    /// Labels of `scheme`, from `schemes.available.<scheme>` (either a list
    /// of labels or an object with a `labels` list).
    pub fn scheme_labels(&self, scheme: &str) -> Vec<String> {
        let entry = &self.schemes["available"][scheme];
        match entry {
            Value::Array(_) => keys_or_items(entry),
            Value::Object(obj) => obj.get("labels").map(keys_or_items).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Feature names listed under `features.available`.
    pub fn available_features(&self) -> Vec<String> {
        keys_or_items(&self.features["available"])
    }

    /// Whether `section.training` reports a running job.
    ///
    /// `training` is either a list of job names or an object keyed by user
    /// name. With a `username`, an object only counts as busy when it has an
    /// entry for that user; a non-empty list always counts.
    pub fn is_training(&self, section: StateSection, username: Option<&str>) -> bool {
        match &self.section(section)["training"] {
            Value::Array(items) => !items.is_empty(),
            Value::Object(obj) => match username {
                Some(user) => obj.contains_key(user),
                None => !obj.is_empty(),
            },
            Value::Bool(flag) => *flag,
            _ => false,
        }
    }
}

fn keys_or_items(value: &Value) -> Vec<String> {
    match value {
        Value::Object(obj) => obj.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Response of `GET /projects/{project_slug}/statistics`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectStatistics {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub train_set_n: i64,
    #[serde(default)]
    pub train_annotated_n: i64,
    #[serde(default)]
    pub train_annotated_distribution: Value,
    #[serde(default)]
    pub test_set_n: Option<i64>,
    #[serde(default)]
    pub test_annotated_n: Option<i64>,
    #[serde(default)]
    pub test_annotated_distribution: Option<Value>,
    #[serde(default)]
    pub sm_10cv: Option<Value>,
}

// ============ Schemes ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemeModel {
    pub project_slug: String,
    pub name: String,
    pub kind: String,
    pub labels: Vec<String>,
}

// ============ Elements & annotations ============

/// Payload of `POST /elements/next`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextRequest {
    pub scheme: String,
    pub selection: String,
    pub sample: String,
    pub label: Option<String>,
    pub frame: Option<Vec<Value>>,
    pub history: Vec<String>,
    pub filter: Option<String>,
}

impl NextRequest {
    /// Deterministic selection among untagged elements.
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            selection: "deterministic".to_string(),
            sample: "untagged".to_string(),
            label: None,
            frame: None,
            history: Vec::new(),
            filter: None,
        }
    }
}

/// An element served for annotation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Element {
    pub element_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub selection: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub predict: Value,
    #[serde(default)]
    pub frame: Option<Vec<Value>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub history: Option<Vec<Value>>,
    #[serde(default)]
    pub n_sample: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationModel {
    pub project_slug: String,
    pub scheme: String,
    pub element_id: String,
    pub label: Option<String>,
    pub dataset: Option<String>,
    pub comment: Option<String>,
    pub selection: Option<String>,
}

// ============ Features ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureModel {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub parameters: Map<String, Value>,
}

// ============ Models ============

/// Payload of `POST /models/simplemodel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleModelRequest {
    pub features: Vec<String>,
    pub model: String,
    pub params: Option<Map<String, Value>>,
    pub scheme: String,
    pub standardize: Option<bool>,
    pub dichotomize: Option<String>,
}

/// Training parameters of a BERT model; defaults match the server's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BertParameters {
    pub batchsize: i64,
    pub gradacc: f64,
    pub epochs: i64,
    pub lrate: f64,
    pub wdecay: f64,
    pub best: bool,
    pub eval: i64,
    pub gpu: bool,
    pub adapt: bool,
}

impl Default for BertParameters {
    fn default() -> Self {
        Self {
            batchsize: 4,
            gradacc: 1.0,
            epochs: 3,
            lrate: 5e-5,
            wdecay: 0.01,
            best: true,
            eval: 10,
            gpu: false,
            adapt: true,
        }
    }
}

/// Payload of `POST /models/bert/train`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BertTrainRequest {
    pub project_slug: String,
    pub scheme: String,
    pub name: String,
    pub base_model: String,
    pub params: BertParameters,
    pub test_size: f64,
    pub dichotomize: Option<String>,
    pub class_min_freq: i64,
    pub class_balance: bool,
}

impl BertTrainRequest {
    pub fn new(project_slug: &str, scheme: &str, name: &str, base_model: &str) -> Self {
        Self {
            project_slug: project_slug.to_string(),
            scheme: scheme.to_string(),
            name: name.to_string(),
            base_model: base_model.to_string(),
            params: BertParameters::default(),
            test_size: 0.2,
            dichotomize: None,
            class_min_freq: 1,
            class_balance: false,
        }
    }
}

/// Response of `GET /models/bert`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BertModelInformation {
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub loss: Option<Value>,
    #[serde(default)]
    pub train_scores: Option<Value>,
    #[serde(default)]
    pub test_scores: Option<Value>,
}

// ============ Projections ============

/// Payload of `POST /elements/projection/compute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionRequest {
    pub method: String,
    pub features: Vec<String>,
    pub params: Map<String, Value>,
}

/// A computed projection: one `(x, y)` point per element id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Projection {
    #[serde(default)]
    pub status: String,
    pub index: Vec<Value>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub predictions: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: Value,
}

/// Reply sent while a computation is still running.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Waiting {
    pub detail: String,
    #[serde(default = "waiting_status")]
    pub status: String,
}

fn waiting_status() -> String {
    "waiting".to_string()
}

/// Response of `GET /elements/projection`: coordinates, a waiting reply, or
/// nothing when no projection was requested.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProjectionReply {
    Ready(Projection),
    Waiting(Waiting),
    None(Option<Value>),
}

impl ProjectionReply {
    pub fn projection(&self) -> Option<&Projection> {
        match self {
            ProjectionReply::Ready(p) => Some(p),
            _ => None,
        }
    }
}

// ============ Queue ============

/// Response of `GET /queue`: job id → job description.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Queue {
    #[serde(default)]
    pub content: BTreeMap<String, BTreeMap<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(features: Value, bert: Value) -> ProjectState {
        serde_json::from_value(json!({
            "params": { "project_name": "Tweets", "project_slug": "tweets" },
            "schemes": { "available": { "default": { "labels": ["pos", "neg"], "kind": "multiclass" }, "topic": ["a"] } },
            "features": features,
            "bertmodels": bert,
            "errors": [],
            "memory": 1.5
        }))
        .unwrap()
    }

    #[test]
    fn state_helpers_read_available_sections() {
        let s = state(
            json!({ "available": ["sbert", "fasttext"], "training": [] }),
            json!({}),
        );
        let mut schemes = s.available_schemes();
        schemes.sort();
        assert_eq!(schemes, vec!["default", "topic"]);
        assert_eq!(s.scheme_labels("default"), vec!["pos", "neg"]);
        assert_eq!(s.scheme_labels("topic"), vec!["a"]);
        assert!(s.scheme_labels("missing").is_empty());
        assert_eq!(s.available_features(), vec!["sbert", "fasttext"]);
    }

    #[test]
    fn project_update_sends_only_set_fields() {
        let update = ProjectUpdate {
            language: Some("en".to_string()),
            add_n_train: Some(50),
            ..ProjectUpdate::default()
        };
        assert!(!update.is_empty());
        assert!(ProjectUpdate::default().is_empty());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "language": "en", "add_n_train": 50 })
        );
    }

    #[test]
    fn training_detection() {
        let s = state(
            json!({ "available": [], "training": ["sbert"] }),
            json!({ "training": { "ada": { "name": "bert-1" } } }),
        );
        assert!(s.is_training(StateSection::Features, None));
        assert!(s.is_training(StateSection::BertModels, Some("ada")));
        assert!(!s.is_training(StateSection::BertModels, Some("grace")));
        assert!(!s.is_training(StateSection::Projections, None));
        assert!(!s.is_training(StateSection::SimpleModel, Some("ada")));
    }

    #[test]
    fn projection_reply_variants() {
        let ready: ProjectionReply = serde_json::from_value(json!({
            "status": "computed", "index": ["1", "2"], "x": [0.1, 0.2], "y": [1.0, 2.0],
            "labels": ["pos", "neg"], "parameters": { "method": "umap" }
        }))
        .unwrap();
        assert_eq!(ready.projection().unwrap().x.len(), 2);

        let waiting: ProjectionReply =
            serde_json::from_value(json!({ "detail": "Projection is computing", "status": "waiting" }))
                .unwrap();
        assert!(matches!(waiting, ProjectionReply::Waiting(_)));

        let none: ProjectionReply = serde_json::from_value(Value::Null).unwrap();
        assert!(none.projection().is_none());
    }

    #[test]
    fn feature_kind_serializes_as_type() {
        let feature = FeatureModel {
            kind: "sbert".to_string(),
            name: "sbert".to_string(),
            parameters: Map::new(),
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "sbert");
    }

    #[test]
    fn bert_defaults_match_server() {
        let req = BertTrainRequest::new("p", "default", "m1", "camembert-base");
        assert_eq!(req.params.batchsize, 4);
        assert_eq!(req.params.epochs, 3);
        assert!((req.test_size - 0.2).abs() < f64::EPSILON);
        assert_eq!(req.class_min_freq, 1);
    }
}
