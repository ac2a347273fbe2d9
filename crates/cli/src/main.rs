use anyhow::Context;
use clap::{Parser, Subcommand};
use medflow_core::config::{config_file_from_env_value, narrative_timeout_from_env_value};
use medflow_core::constants::DEFAULT_CASE_DATA_DIR;
use medflow_core::{
    Actor, CaseId, ClinicalUpdate, CoreConfig, DemoNarrative, FileCaseStore, ImageReport,
    NewCase, Role, TriageLevel, TriageService, VitalSigns,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medflow")]
#[command(about = "MedFlow triage queue CLI")]
struct Cli {
    /// Case data directory (overrides MEDFLOW_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct VitalArgs {
    /// Temperature in °C
    #[arg(long)]
    temperature: Option<f64>,
    /// Heart rate in bpm
    #[arg(long)]
    heart_rate: Option<f64>,
    /// Respiratory rate in breaths/min
    #[arg(long)]
    respiratory_rate: Option<f64>,
    /// Blood pressure, e.g. 120/80
    #[arg(long)]
    blood_pressure: Option<String>,
}

impl VitalArgs {
    fn into_vitals(self) -> Option<VitalSigns> {
        let vitals = VitalSigns {
            temperature: self.temperature,
            heart_rate: self.heart_rate,
            respiratory_rate: self.respiratory_rate,
            blood_pressure: self.blood_pressure,
        };
        (!vitals.is_empty()).then_some(vitals)
    }
}

#[derive(clap::Args)]
struct ActorArgs {
    /// Name of the person performing the action
    #[arg(long = "as")]
    name: String,
    /// Role: patient, nurse, physician, specialist or admin
    #[arg(long)]
    role: String,
}

impl ActorArgs {
    fn into_actor(self) -> anyhow::Result<Actor> {
        let role: Role = self.role.parse()?;
        Ok(Actor::new(self.name, role)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new consultation
    Submit {
        /// Chief complaint
        #[arg(long)]
        complaint: Option<String>,
        /// Symptom (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,
        /// Medical history entry (repeatable)
        #[arg(long = "history")]
        history: Vec<String>,
        /// Self-reported severity, 1-10
        #[arg(long)]
        severity: Option<u8>,
        /// Free-text image findings
        #[arg(long, conflicts_with = "findings_file")]
        findings: Option<String>,
        /// Imaging model output to parse into findings
        #[arg(long)]
        findings_file: Option<PathBuf>,
        #[command(flatten)]
        vitals: VitalArgs,
        /// Read the whole submission from a JSON file instead
        #[arg(long, conflicts_with_all = ["complaint", "symptoms", "severity"])]
        json: Option<PathBuf>,
    },
    /// Triage a pending case
    Triage {
        /// Case ID
        case_id: CaseId,
        /// Attach a demonstration narrative
        #[arg(long)]
        narrative: bool,
    },
    /// Re-evaluate a queued case with updated information
    Retriage {
        /// Case ID
        case_id: CaseId,
        #[command(flatten)]
        actor: ActorArgs,
        /// Additional symptom (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,
        /// Additional history entry (repeatable)
        #[arg(long = "history")]
        history: Vec<String>,
        /// Replacement severity, 1-10
        #[arg(long)]
        severity: Option<u8>,
        /// Replacement image findings
        #[arg(long)]
        findings: Option<String>,
        #[command(flatten)]
        vitals: VitalArgs,
    },
    /// Claim a triaged case for review
    Claim {
        /// Case ID
        case_id: CaseId,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Complete a case under review
    Complete {
        /// Case ID
        case_id: CaseId,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Show one case
    Show {
        /// Case ID
        case_id: CaseId,
    },
    /// List all cases
    List,
    /// Show the queue by triage level
    Queue {
        /// Only show one level: critical, urgent or routine
        #[arg(long)]
        level: Option<TriageLevel>,
    },
    /// Show queue statistics
    Stats,
    /// Rule-based differential diagnosis for a case
    Diagnose {
        /// Case ID
        case_id: CaseId,
    },
    /// Parse imaging model output from a text file
    AnalyseFindings {
        /// File containing the model's text output
        file: PathBuf,
    },
}

fn load_config(data_dir: Option<PathBuf>) -> anyhow::Result<Arc<CoreConfig>> {
    let data_dir = data_dir
        .or_else(|| {
            std::env::var("MEDFLOW_DATA_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CASE_DATA_DIR));
    let file = config_file_from_env_value(std::env::var("MEDFLOW_CONFIG").ok())
        .context("failed to load MEDFLOW_CONFIG")?;
    let timeout =
        narrative_timeout_from_env_value(std::env::var("MEDFLOW_NARRATIVE_TIMEOUT_MS").ok())?;

    Ok(Arc::new(CoreConfig::new(
        data_dir,
        file.scoring,
        file.queue,
        timeout,
    )?))
}

fn open_service(data_dir: Option<PathBuf>) -> anyhow::Result<TriageService<FileCaseStore>> {
    let cfg = load_config(data_dir)?;
    tracing::debug!("using case data directory {}", cfg.case_data_dir().display());
    let store = FileCaseStore::from_config(&cfg)?;
    Ok(TriageService::new(cfg, store)?)
}

fn analyse_file(path: &Path) -> anyhow::Result<ImageReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ImageReport::from_model_text(&text))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medflow=info".parse()?)
                .add_directive("medflow_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'medflow --help' for commands");
        return Ok(());
    };

    let data_dir = cli.data_dir;

    match command {
        Commands::Submit {
            complaint,
            symptoms,
            history,
            severity,
            findings,
            findings_file,
            vitals,
            json,
        } => {
            let input = match json {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    serde_json::from_str::<NewCase>(&text)
                        .with_context(|| format!("invalid submission in {}", path.display()))?
                }
                None => {
                    let ai_findings = match findings_file {
                        Some(path) => Some(analyse_file(&path)?.findings_text()),
                        None => findings,
                    };
                    NewCase {
                        chief_complaint: complaint.unwrap_or_default(),
                        symptoms,
                        medical_history: history,
                        vital_signs: vitals.into_vitals(),
                        ai_findings,
                        severity: severity.context("--severity is required")?,
                    }
                }
            };
            let case = open_service(data_dir)?.submit(input)?;
            println!("Submitted case {}", case.id());
        }
        Commands::Triage { case_id, narrative } => {
            let service = open_service(data_dir)?;
            let case = if narrative {
                service.triage_with_narrative(case_id, &DemoNarrative).await?
            } else {
                service.triage(case_id)?
            };
            print_json(&case)?;
        }
        Commands::Retriage {
            case_id,
            actor,
            symptoms,
            history,
            severity,
            findings,
            vitals,
        } => {
            let update = ClinicalUpdate {
                vital_signs: vitals.into_vitals(),
                additional_symptoms: symptoms,
                additional_history: history,
                ai_findings: findings,
                severity,
            };
            let case = open_service(data_dir)?.retriage(case_id, &actor.into_actor()?, update)?;
            print_json(&case)?;
        }
        Commands::Claim { case_id, actor } => {
            let case = open_service(data_dir)?.claim(case_id, &actor.into_actor()?)?;
            println!(
                "Case {} claimed by {}",
                case.id(),
                case.claimed_by().unwrap_or("-")
            );
        }
        Commands::Complete { case_id, actor } => {
            let case = open_service(data_dir)?.complete(case_id, &actor.into_actor()?)?;
            println!("Case {} completed", case.id());
        }
        Commands::Show { case_id } => {
            print_json(&open_service(data_dir)?.get(case_id)?)?;
        }
        Commands::List => {
            let cases = open_service(data_dir)?.list()?;
            if cases.is_empty() {
                println!("No cases found.");
            }
            for case in cases {
                let level = case
                    .triage_level()
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "ID: {}, Status: {}, Level: {}, Complaint: {}, Created: {}",
                    case.id(),
                    case.status(),
                    level,
                    case.chief_complaint(),
                    case.created_at()
                );
            }
        }
        Commands::Queue { level } => {
            let snapshot = open_service(data_dir)?.queue()?;
            match level {
                Some(level) => print_json(&snapshot.level(level))?,
                None => print_json(&snapshot)?,
            }
        }
        Commands::Stats => {
            print_json(&open_service(data_dir)?.stats(chrono::Utc::now())?)?;
        }
        Commands::Diagnose { case_id } => {
            print_json(&open_service(data_dir)?.differential(case_id)?)?;
        }
        Commands::AnalyseFindings { file } => print_json(&analyse_file(&file)?)?,
    }

    Ok(())
}
