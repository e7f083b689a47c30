//! # ActiveTigger CLI (`tigger`)
//!
//! The `tigger` binary drives an ActiveTigger server from the terminal:
//! login, project and scheme management, annotation, features, models,
//! projections, exports, and waiting on background jobs.
//!
//! ## Usage
//!
//! ```bash
//! tigger --config ./config/tigger.toml [--project <slug>] [--scheme <name>] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tigger login` | Exchange user name and password for a token |
//! | `tigger logout` | End the server session and forget the token |
//! | `tigger projects <action>` | List, show, create, update, or delete projects; add a test set; show user roles |
//! | `tigger scheme <action>` | Add or delete coding schemes |
//! | `tigger label <action>` | Add, delete, or rename labels |
//! | `tigger feature <action>` | Compute or delete features |
//! | `tigger next` / `element` | Fetch elements to annotate |
//! | `tigger annotate` / `unannotate` | Record or remove an annotation |
//! | `tigger simplemodel` | Train the quick model |
//! | `tigger bert <action>` | Train, rename, delete, predict, inspect BERT models |
//! | `tigger projection <action>` | Compute or show a 2-D projection |
//! | `tigger queue` | Show server jobs |
//! | `tigger export <kind>` | Download annotations, features, predictions, models |
//! | `tigger watch <job>` | Wait until a background job completes |
//!
//! Data is printed on stdout. Notifications and logs (`TIGGER_LOG`) go to
//! stderr.

mod commands;

use activetigger_client::config;
use activetigger_client::notify::NotifyMode;
use activetigger_client::ops::Selection;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ActiveTigger CLI: annotate, train, and export against an ActiveTigger
/// server.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, a local server on port 5000 is assumed.
#[derive(Parser)]
#[command(
    name = "tigger",
    about = "Command-line client for the ActiveTigger annotation platform",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tigger.toml")]
    config: PathBuf,

    /// Notification output: `human`, `json`, or `off`. Defaults to `human`
    /// on a terminal and `json` otherwise.
    #[arg(long, global = true, value_parser = parse_notify_mode)]
    notify: Option<NotifyMode>,

    /// Project slug; overrides `[defaults].project`.
    #[arg(long, global = true, env = "TIGGER_PROJECT")]
    project: Option<String>,

    /// Scheme name; overrides `[defaults].scheme`.
    #[arg(long, global = true, env = "TIGGER_SCHEME")]
    scheme: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the bearer token.
    Login {
        /// User name; defaults to `[defaults].username`.
        #[arg(long)]
        username: Option<String>,

        #[arg(long, env = "TIGGER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out. The stored token is kept if the server refuses.
    Logout,

    /// Show the stored user name.
    Whoami,

    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    Scheme {
        #[command(subcommand)]
        action: SchemeAction,
    },

    /// Manage the labels of the selected scheme.
    Label {
        #[command(subcommand)]
        action: LabelCmd,
    },

    Feature {
        #[command(subcommand)]
        action: FeatureAction,
    },

    /// Fetch the next element to annotate.
    Next {
        /// Selection mode: `deterministic`, `random`, `maxprob`, `active`.
        #[arg(long, default_value = "deterministic")]
        selection: String,

        /// Sample: `untagged`, `tagged`, or `all`.
        #[arg(long, default_value = "untagged")]
        sample: String,

        /// Restrict to elements with this label (tagged sample).
        #[arg(long)]
        label: Option<String>,

        /// Text filter (regular expression).
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show one element.
    Element { id: String },

    /// Annotate an element with a label.
    Annotate {
        id: String,
        label: String,

        #[arg(long)]
        comment: Option<String>,

        /// Dataset the element belongs to (`train` or `test`).
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Remove the annotation of an element.
    Unannotate {
        id: String,

        #[arg(long)]
        dataset: Option<String>,
    },

    /// Train the quick model of the selected scheme.
    Simplemodel {
        /// Model: `liblinear`, `knn`, `randomforest`, `lasso`, `multi_naivebayes`.
        model: String,

        /// Feature to train on (repeatable).
        #[arg(long = "feature", required = true)]
        features: Vec<String>,

        /// Model parameter as `key=value` (repeatable).
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        #[arg(long)]
        standardize: bool,

        /// Keep this label and merge the others.
        #[arg(long)]
        dichotomize: Option<String>,
    },

    Bert {
        #[command(subcommand)]
        action: BertCmd,
    },

    Projection {
        #[command(subcommand)]
        action: ProjectionAction,
    },

    /// Show jobs queued or running on the server.
    Queue,

    /// Download an export into `[export].dir` (or `--dir`).
    Export {
        #[command(subcommand)]
        kind: ExportKind,

        #[arg(long, global = true)]
        dir: Option<PathBuf>,
    },

    /// Wait until a background job of the selected project completes.
    Watch {
        job: WatchJob,

        /// Poll interval; defaults to `[polling].interval_ms`.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ProjectsAction {
    /// List projects visible to the logged-in user.
    List,
    /// Print the full state of the selected project as JSON.
    Show,
    /// Print annotation statistics of the selected project and scheme.
    Stats,
    /// Create a project from a CSV file.
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        file: PathBuf,

        /// Column holding the element id.
        #[arg(long)]
        id_col: String,

        /// Text column (repeatable).
        #[arg(long = "text-col", required = true)]
        text_cols: Vec<String>,

        /// Column holding existing labels (repeatable).
        #[arg(long = "label-col")]
        label_cols: Vec<String>,

        /// Context column (repeatable).
        #[arg(long = "context-col")]
        context_cols: Vec<String>,

        #[arg(long, default_value_t = 100)]
        n_train: i64,

        #[arg(long, default_value_t = 0)]
        n_test: i64,

        #[arg(long, default_value = "fr")]
        language: String,
    },
    /// Change settings of the selected project or grow its train set.
    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        language: Option<String>,

        /// Replacement text columns (repeatable).
        #[arg(long = "text-col")]
        text_cols: Vec<String>,

        /// Replacement context columns (repeatable).
        #[arg(long = "context-col")]
        context_cols: Vec<String>,

        /// Number of elements to add to the train set.
        #[arg(long)]
        add_n_train: Option<i64>,
    },
    /// Add a test set from a CSV file to the selected project.
    Testset {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        id_col: String,

        #[arg(long)]
        text_col: String,

        /// Column holding existing labels for the selected scheme.
        #[arg(long)]
        label_col: Option<String>,

        #[arg(long)]
        n_test: i64,
    },
    /// Print the users with a role on the selected project.
    Auth,
    /// Delete the selected project.
    Delete,
}

#[derive(Subcommand)]
enum SchemeAction {
    Add {
        name: String,

        /// `multiclass` or `multilabel`.
        #[arg(long)]
        kind: Option<String>,

        /// Initial label (repeatable).
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// Delete the selected scheme.
    Delete,
    /// List schemes of the selected project.
    List,
}

#[derive(Subcommand)]
enum LabelCmd {
    Add { label: String },
    Delete { label: String },
    Rename { former: String, new: String },
}

#[derive(Subcommand)]
enum FeatureAction {
    /// Start computing a feature (`sbert`, `fasttext`, `regex`, `dataset`).
    Add {
        kind: String,

        #[arg(long)]
        name: Option<String>,

        /// Feature parameter as `key=value` (repeatable).
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    Delete { name: String },
    /// List computed features of the selected project.
    List,
}

#[derive(Subcommand)]
enum BertCmd {
    Train {
        name: String,

        #[arg(long)]
        base_model: String,

        #[arg(long)]
        epochs: Option<i64>,

        #[arg(long)]
        batch_size: Option<i64>,

        #[arg(long)]
        lrate: Option<f64>,

        #[arg(long)]
        test_size: Option<f64>,

        #[arg(long)]
        gpu: bool,

        #[arg(long)]
        class_balance: bool,
    },
    Rename { former: String, new: String },
    Delete { name: String },
    Predict {
        name: String,

        #[arg(long, default_value = "all")]
        dataset: String,
    },
    /// Print parameters and scores of a trained model.
    Info { name: String },
}

#[derive(Subcommand)]
enum ProjectionAction {
    Compute {
        /// `umap` or `tsne`.
        #[arg(long, default_value = "umap")]
        method: String,

        #[arg(long = "feature", required = true)]
        features: Vec<String>,

        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    Show,
}

#[derive(Subcommand)]
enum ExportKind {
    Annotations {
        #[arg(long, default_value = "csv")]
        format: String,

        #[arg(long)]
        dataset: Option<String>,
    },
    Features {
        #[arg(long = "feature", required = true)]
        features: Vec<String>,

        #[arg(long, default_value = "csv")]
        format: String,
    },
    Predictions {
        #[arg(long)]
        model: String,

        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Download a trained BERT model archive.
    Model { name: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WatchJob {
    Features,
    Simplemodel,
    Bert,
    Projection,
}

fn parse_notify_mode(s: &str) -> Result<NotifyMode, String> {
    NotifyMode::parse(s).ok_or_else(|| format!("expected human, json, or off (got '{}')", s))
}

/// Parse a `key=value` pair for `--param` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TIGGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_or_minimal(&cli.config)?;
    let mode = cli.notify.unwrap_or_else(NotifyMode::default_for_tty);
    let selection = Selection {
        project: cli.project.or_else(|| cfg.defaults.project.clone()),
        scheme: cli.scheme.or_else(|| cfg.defaults.scheme.clone()),
    };
    let ctx = commands::Context::open(cfg, mode, selection)?;

    match cli.command {
        Commands::Login { username, password } => {
            let username = username
                .or_else(|| ctx.config.defaults.username.clone())
                .ok_or_else(|| anyhow!("No user name: pass --username or set [defaults].username"))?;
            let password = password
                .ok_or_else(|| anyhow!("No password: pass --password or set TIGGER_PASSWORD"))?;
            commands::run_login(&ctx, &username, &password).await?;
        }
        Commands::Logout => commands::run_logout(&ctx).await?,
        Commands::Whoami => commands::run_whoami(&ctx)?,
        Commands::Projects { action } => match action {
            ProjectsAction::List => commands::run_projects_list(&ctx).await?,
            ProjectsAction::Show => commands::run_project_show(&ctx).await?,
            ProjectsAction::Stats => commands::run_project_stats(&ctx).await?,
            ProjectsAction::Create {
                name,
                file,
                id_col,
                text_cols,
                label_cols,
                context_cols,
                n_train,
                n_test,
                language,
            } => {
                let columns = commands::ProjectColumns {
                    id_col,
                    text_cols,
                    label_cols,
                    context_cols,
                    n_train,
                    n_test,
                    language,
                };
                commands::run_project_create(&ctx, &name, &file, columns).await?;
            }
            ProjectsAction::Update {
                name,
                language,
                text_cols,
                context_cols,
                add_n_train,
            } => {
                let update = activetigger_client::models::ProjectUpdate {
                    project_name: name,
                    language,
                    cols_text: (!text_cols.is_empty()).then_some(text_cols),
                    cols_context: (!context_cols.is_empty()).then_some(context_cols),
                    add_n_train,
                };
                commands::run_project_update(&ctx, &update).await?;
            }
            ProjectsAction::Testset {
                file,
                id_col,
                text_col,
                label_col,
                n_test,
            } => {
                commands::run_project_testset(&ctx, &file, &id_col, &text_col, label_col, n_test)
                    .await?
            }
            ProjectsAction::Auth => commands::run_project_auth(&ctx).await?,
            ProjectsAction::Delete => commands::run_project_delete(&ctx).await?,
        },
        Commands::Scheme { action } => match action {
            SchemeAction::Add { name, kind, labels } => {
                commands::run_scheme_add(&ctx, &name, kind.as_deref(), &labels).await?
            }
            SchemeAction::Delete => commands::run_scheme_delete(&ctx).await?,
            SchemeAction::List => commands::run_scheme_list(&ctx).await?,
        },
        Commands::Label { action } => match action {
            LabelCmd::Add { label } => commands::run_label_add(&ctx, &label).await?,
            LabelCmd::Delete { label } => commands::run_label_delete(&ctx, &label).await?,
            LabelCmd::Rename { former, new } => {
                commands::run_label_rename(&ctx, &former, &new).await?
            }
        },
        Commands::Feature { action } => match action {
            FeatureAction::Add { kind, name, params } => {
                commands::run_feature_add(&ctx, &kind, name.as_deref(), params).await?
            }
            FeatureAction::Delete { name } => commands::run_feature_delete(&ctx, &name).await?,
            FeatureAction::List => commands::run_feature_list(&ctx).await?,
        },
        Commands::Next {
            selection,
            sample,
            label,
            filter,
        } => commands::run_next(&ctx, selection, sample, label, filter).await?,
        Commands::Element { id } => commands::run_element(&ctx, &id).await?,
        Commands::Annotate {
            id,
            label,
            comment,
            dataset,
        } => commands::run_annotate(&ctx, &id, Some(label), comment, dataset).await?,
        Commands::Unannotate { id, dataset } => {
            commands::run_annotate(&ctx, &id, None, None, dataset).await?
        }
        Commands::Simplemodel {
            model,
            features,
            params,
            standardize,
            dichotomize,
        } => {
            commands::run_simplemodel(&ctx, &model, features, params, standardize, dichotomize)
                .await?
        }
        Commands::Bert { action } => match action {
            BertCmd::Train {
                name,
                base_model,
                epochs,
                batch_size,
                lrate,
                test_size,
                gpu,
                class_balance,
            } => {
                let mut training =
                    activetigger_client::ops::BertTraining::new(&name, &base_model);
                if let Some(epochs) = epochs {
                    training.params.epochs = epochs;
                }
                if let Some(batch_size) = batch_size {
                    training.params.batchsize = batch_size;
                }
                if let Some(lrate) = lrate {
                    training.params.lrate = lrate;
                }
                if let Some(test_size) = test_size {
                    training.test_size = test_size;
                }
                training.params.gpu = gpu;
                training.class_balance = class_balance;
                commands::run_bert_train(&ctx, &training).await?
            }
            BertCmd::Rename { former, new } => {
                commands::run_bert_rename(&ctx, &former, &new).await?
            }
            BertCmd::Delete { name } => commands::run_bert_delete(&ctx, &name).await?,
            BertCmd::Predict { name, dataset } => {
                commands::run_bert_predict(&ctx, &name, &dataset).await?
            }
            BertCmd::Info { name } => commands::run_bert_info(&ctx, &name).await?,
        },
        Commands::Projection { action } => match action {
            ProjectionAction::Compute {
                method,
                features,
                params,
            } => commands::run_projection_compute(&ctx, method, features, params).await?,
            ProjectionAction::Show => commands::run_projection_show(&ctx).await?,
        },
        Commands::Queue => commands::run_queue(&ctx).await?,
        Commands::Export { kind, dir } => {
            let request = match kind {
                ExportKind::Annotations { format, dataset } => {
                    commands::ExportRequest::Annotations { format, dataset }
                }
                ExportKind::Features { features, format } => {
                    commands::ExportRequest::Features { features, format }
                }
                ExportKind::Predictions { model, format } => {
                    commands::ExportRequest::Predictions { model, format }
                }
                ExportKind::Model { name } => commands::ExportRequest::BertModel { model: name },
            };
            commands::run_export(&ctx, &request, dir).await?
        }
        Commands::Watch { job, interval_ms } => {
            let job = match job {
                WatchJob::Features => commands::Job::Features,
                WatchJob::Simplemodel => commands::Job::SimpleModel,
                WatchJob::Bert => commands::Job::Bert,
                WatchJob::Projection => commands::Job::Projection,
            };
            commands::run_watch(&ctx, job, interval_ms).await?
        }
    }

    Ok(())
}
