//! The remote API's path/method contract.
//!
//! Every endpoint the client calls is a [`Route`] variant. A route knows its
//! HTTP method and renders its own path, so call sites never format URLs by
//! hand and a GET route cannot be sent as a POST.
//!
//! | Route | Method | Path |
//! |-------|--------|------|
//! | [`Route::Token`] | POST | `/token` |
//! | [`Route::Disconnect`] | POST | `/users/disconnect` |
//! | [`Route::Projects`] | GET | `/projects` |
//! | [`Route::ProjectNew`] | POST | `/projects/new` |
//! | [`Route::ProjectDelete`] | POST | `/projects/delete` |
//! | [`Route::ProjectUpdate`] | POST | `/projects/update` |
//! | [`Route::TestSetCreate`] | POST | `/projects/testset/create` |
//! | [`Route::ProjectAuth`] | GET | `/projects/auth` |
//! | [`Route::Project`] | GET | `/projects/{project_slug}` |
//! | [`Route::ProjectStatistics`] | GET | `/projects/{project_slug}/statistics` |
//! | [`Route::Scheme`] | POST | `/schemes/{action}` |
//! | [`Route::Label`] | POST | `/schemes/label/{action}` |
//! | [`Route::Feature`] | POST | `/features/{action}` |
//! | [`Route::NextElement`] | POST | `/elements/next` |
//! | [`Route::Element`] | GET | `/elements/{element_id}` |
//! | [`Route::Tag`] | POST | `/tags/{action}` |
//! | [`Route::Annotation`] | POST | `/annotation/{action}` |
//! | [`Route::SimpleModel`] | POST | `/models/simplemodel` |
//! | [`Route::Bert`] | POST | `/models/bert/{action}` |
//! | [`Route::BertInformation`] | GET | `/models/bert` |
//! | [`Route::ProjectionCompute`] | POST | `/elements/projection/compute` |
//! | [`Route::Projection`] | GET | `/elements/projection` |
//! | [`Route::Queue`] | GET | `/queue` |
//! | [`Route::Export`] | GET | `/export/{kind}` |

use reqwest::Method;
use std::fmt;

/// Add/delete actions shared by schemes, features, tags, and annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Delete => "delete",
        }
    }
}

/// Label actions under `/schemes/label/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAction {
    Add,
    Delete,
    Rename,
}

impl LabelAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelAction::Add => "add",
            LabelAction::Delete => "delete",
            LabelAction::Rename => "rename",
        }
    }
}

/// BERT model actions under `/models/bert/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BertAction {
    Train,
    Rename,
    Delete,
    Predict,
}

impl BertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BertAction::Train => "train",
            BertAction::Rename => "rename",
            BertAction::Delete => "delete",
            BertAction::Predict => "predict",
        }
    }
}

/// Export endpoints under `/export/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRoute {
    Data,
    Features,
    Prediction,
    Bert,
}

impl ExportRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportRoute::Data => "data",
            ExportRoute::Features => "features",
            ExportRoute::Prediction => "prediction",
            ExportRoute::Bert => "bert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Token,
    Disconnect,
    Projects,
    ProjectNew,
    ProjectDelete,
    ProjectUpdate,
    TestSetCreate,
    ProjectAuth,
    Project { project_slug: String },
    ProjectStatistics { project_slug: String },
    Scheme(Action),
    Label(LabelAction),
    Feature(Action),
    NextElement,
    Element { element_id: String },
    Tag(Action),
    Annotation(Action),
    SimpleModel,
    Bert(BertAction),
    BertInformation,
    ProjectionCompute,
    Projection,
    Queue,
    Export(ExportRoute),
}

impl Route {
    pub fn method(&self) -> Method {
        match self {
            Route::Projects
            | Route::ProjectAuth
            | Route::Project { .. }
            | Route::ProjectStatistics { .. }
            | Route::Element { .. }
            | Route::BertInformation
            | Route::Projection
            | Route::Queue
            | Route::Export(_) => Method::GET,
            Route::Token
            | Route::Disconnect
            | Route::ProjectNew
            | Route::ProjectDelete
            | Route::ProjectUpdate
            | Route::TestSetCreate
            | Route::Scheme(_)
            | Route::Label(_)
            | Route::Feature(_)
            | Route::NextElement
            | Route::Tag(_)
            | Route::Annotation(_)
            | Route::SimpleModel
            | Route::Bert(_)
            | Route::ProjectionCompute => Method::POST,
        }
    }

    /// Path relative to the API base URL, always starting with `/`.
    ///
    /// Path segments taken from identifiers are percent-encoded.
    pub fn path(&self) -> String {
        match self {
            Route::Token => "/token".to_string(),
            Route::Disconnect => "/users/disconnect".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::ProjectNew => "/projects/new".to_string(),
            Route::ProjectDelete => "/projects/delete".to_string(),
            Route::ProjectUpdate => "/projects/update".to_string(),
            Route::TestSetCreate => "/projects/testset/create".to_string(),
            Route::ProjectAuth => "/projects/auth".to_string(),
            Route::Project { project_slug } => format!("/projects/{}", encode_segment(project_slug)),
            Route::ProjectStatistics { project_slug } => {
                format!("/projects/{}/statistics", encode_segment(project_slug))
            }
            Route::Scheme(action) => format!("/schemes/{}", action.as_str()),
            Route::Label(action) => format!("/schemes/label/{}", action.as_str()),
            Route::Feature(action) => format!("/features/{}", action.as_str()),
            Route::NextElement => "/elements/next".to_string(),
            Route::Element { element_id } => format!("/elements/{}", encode_segment(element_id)),
            Route::Tag(action) => format!("/tags/{}", action.as_str()),
            Route::Annotation(action) => format!("/annotation/{}", action.as_str()),
            Route::SimpleModel => "/models/simplemodel".to_string(),
            Route::Bert(action) => format!("/models/bert/{}", action.as_str()),
            Route::BertInformation => "/models/bert".to_string(),
            Route::ProjectionCompute => "/elements/projection/compute".to_string(),
            Route::Projection => "/elements/projection".to_string(),
            Route::Queue => "/queue".to_string(),
            Route::Export(kind) => format!("/export/{}", kind.as_str()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_server_contract() {
        assert_eq!(Route::Token.path(), "/token");
        assert_eq!(Route::Label(LabelAction::Rename).path(), "/schemes/label/rename");
        assert_eq!(Route::Bert(BertAction::Predict).path(), "/models/bert/predict");
        assert_eq!(Route::Export(ExportRoute::Prediction).path(), "/export/prediction");
        assert_eq!(
            Route::Project {
                project_slug: "tweets-2024".to_string()
            }
            .path(),
            "/projects/tweets-2024"
        );
    }

    #[test]
    fn methods_follow_read_write_split() {
        assert_eq!(Route::Projects.method(), Method::GET);
        assert_eq!(Route::BertInformation.method(), Method::GET);
        assert_eq!(Route::Bert(BertAction::Train).method(), Method::POST);
        assert_eq!(Route::ProjectDelete.method(), Method::POST);
        assert_eq!(Route::ProjectAuth.method(), Method::GET);
        assert_eq!(Route::TestSetCreate.path(), "/projects/testset/create");
        assert_eq!(Route::Projection.method(), Method::GET);
        assert_eq!(Route::ProjectionCompute.method(), Method::POST);
    }

    #[test]
    fn identifiers_are_percent_encoded() {
        let route = Route::Element {
            element_id: "a b/c".to_string(),
        };
        assert_eq!(route.path(), "/elements/a%20b%2Fc");
        assert_eq!(route.to_string(), "GET /elements/a%20b%2Fc");
    }
}
