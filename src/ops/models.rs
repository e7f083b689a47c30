//! Simple models and BERT models.

use serde_json::{Map, Value};

use super::{Selection, Session, SELECT_PROJECT};
use crate::client::RequestOptions;
use crate::models::{BertModelInformation, BertParameters, BertTrainRequest, SimpleModelRequest};
use crate::notify::Severity;
use crate::routes::{BertAction, Route};

/// A simple model training run on the selected scheme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleModelTraining {
    pub model: String,
    pub features: Vec<String>,
    pub params: Option<Map<String, Value>>,
    pub standardize: bool,
    /// Label kept as-is; every other label becomes "not <label>".
    pub dichotomize: Option<String>,
}

impl SimpleModelTraining {
    pub fn new(model: &str, features: Vec<String>) -> Self {
        Self {
            model: model.to_string(),
            features,
            ..Self::default()
        }
    }
}

/// A BERT training run, before the project and scheme are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct BertTraining {
    pub name: String,
    pub base_model: String,
    pub params: BertParameters,
    pub test_size: f64,
    pub class_min_freq: i64,
    pub class_balance: bool,
    pub dichotomize: Option<String>,
}

impl BertTraining {
    pub fn new(name: &str, base_model: &str) -> Self {
        let defaults = BertTrainRequest::new("", "", name, base_model);
        Self {
            name: defaults.name,
            base_model: defaults.base_model,
            params: defaults.params,
            test_size: defaults.test_size,
            class_min_freq: defaults.class_min_freq,
            class_balance: defaults.class_balance,
            dichotomize: defaults.dichotomize,
        }
    }
}

impl Session {
    /// Trains the quick model of the selected scheme.
    pub async fn train_simplemodel(&self, selection: &Selection, training: &SimpleModelTraining) -> bool {
        let Some((project, scheme)) = self.require_scheme(selection) else {
            return false;
        };
        let Some(model) = self.require(Some(training.model.as_str()), "Select a model") else {
            return false;
        };
        if !self.ensure(!training.features.is_empty(), "Select at least one feature") {
            return false;
        }
        let request = SimpleModelRequest {
            features: training.features.clone(),
            model: model.to_string(),
            params: training.params.clone(),
            scheme: scheme.to_string(),
            standardize: Some(training.standardize),
            dichotomize: training.dichotomize.clone(),
        };
        let result = self
            .mutate(Route::SimpleModel, Self::scoped(project).json(&request))
            .await;
        self.settle(
            result,
            Severity::Warning,
            format!("Simple model {} under computation", model),
        )
    }

    pub async fn train_bert(&self, selection: &Selection, training: &BertTraining) -> bool {
        let Some((project, scheme)) = self.require_scheme(selection) else {
            return false;
        };
        let Some(name) = self.require(Some(training.name.as_str()), "Give a name to the model") else {
            return false;
        };
        let Some(base_model) = self.require(Some(training.base_model.as_str()), "Select a base model")
        else {
            return false;
        };
        if !self.ensure(
            training.test_size > 0.0 && training.test_size < 1.0,
            "Test size must be between 0 and 1",
        ) {
            return false;
        }
        let mut request = BertTrainRequest::new(project, scheme, name, base_model);
        request.params = training.params.clone();
        request.test_size = training.test_size;
        request.class_min_freq = training.class_min_freq;
        request.class_balance = training.class_balance;
        request.dichotomize = training.dichotomize.clone();

        let result = self
            .mutate(Route::Bert(BertAction::Train), Self::scoped(project).json(&request))
            .await;
        self.settle(
            result,
            Severity::Warning,
            format!("Model {} under computation", name),
        )
    }

    pub async fn rename_bert(&self, selection: &Selection, former: &str, new: &str) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(former) = self.require(Some(former), "Select a model to rename") else {
            return false;
        };
        let Some(new) = self.require(Some(new), "Give a new name to the model") else {
            return false;
        };
        let options = Self::scoped(project)
            .query("former_name", former)
            .query("new_name", new);
        let result = self.mutate(Route::Bert(BertAction::Rename), options).await;
        self.settle(
            result,
            Severity::Success,
            format!("Model {} renamed to {}", former, new),
        )
    }

    pub async fn delete_bert(&self, selection: &Selection, name: &str) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(name) = self.require(Some(name), "Select a model to delete") else {
            return false;
        };
        let result = self
            .mutate(
                Route::Bert(BertAction::Delete),
                Self::scoped(project).query("bert_name", name),
            )
            .await;
        self.settle(result, Severity::Success, format!("Model {} deleted", name))
    }

    /// Starts a prediction of model `name` on `dataset` (`all`, `train`,
    /// `test`...).
    pub async fn predict_bert(&self, selection: &Selection, name: &str, dataset: &str) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(name) = self.require(Some(name), "Select a model first") else {
            return false;
        };
        let Some(dataset) = self.require(Some(dataset), "Select a dataset") else {
            return false;
        };
        let options = Self::scoped(project)
            .query("model_name", name)
            .query("dataset", dataset);
        let result = self.mutate(Route::Bert(BertAction::Predict), options).await;
        self.settle(
            result,
            Severity::Warning,
            format!("Prediction with {} under computation", name),
        )
    }

    /// Parameters, loss curve, and scores of a trained model.
    pub async fn bert_information(&self, selection: &Selection, name: &str) -> Option<BertModelInformation> {
        let project = selection.project()?;
        if name.trim().is_empty() {
            return None;
        }
        let options = RequestOptions::new()
            .query("project_slug", project)
            .query("name", name);
        let result = self.client.get(&Route::BertInformation, options).await;
        self.read("model information", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::credential::MemoryCredentialStore;
    use crate::notify::MemoryNotifier;
    use std::sync::Arc;

    fn session(notifier: Arc<MemoryNotifier>) -> Session {
        let client =
            ApiClient::new("http://127.0.0.1:9", Arc::new(MemoryCredentialStore::new())).unwrap();
        Session::new(client, notifier)
    }

    #[test]
    fn training_defaults_follow_request_defaults() {
        let training = BertTraining::new("m1", "camembert-base");
        assert_eq!(training.params, BertParameters::default());
        assert!((training.test_size - 0.2).abs() < f64::EPSILON);
        assert_eq!(training.class_min_freq, 1);
    }

    #[tokio::test]
    async fn simplemodel_needs_features() {
        let notifier = Arc::new(MemoryNotifier::new());
        let s = session(notifier.clone());
        let sel = Selection::new(Some("p1"), Some("default"));
        let training = SimpleModelTraining::new("liblinear", Vec::new());
        assert!(!s.train_simplemodel(&sel, &training).await);
        let seen = notifier.take();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "Select at least one feature");
    }

    #[tokio::test]
    async fn bert_test_size_is_bounded() {
        let notifier = Arc::new(MemoryNotifier::new());
        let s = session(notifier.clone());
        let sel = Selection::new(Some("p1"), Some("default"));
        let mut training = BertTraining::new("m1", "camembert-base");
        training.test_size = 1.5;
        assert!(!s.train_bert(&sel, &training).await);
        assert_eq!(notifier.count(Severity::Error), 1);
    }
}
