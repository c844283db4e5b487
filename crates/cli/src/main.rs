//! Interactive surface for the consultation coordinator.
//!
//! Wires the core services over the in-memory store so the full
//! promotion + dispatch flow can be exercised from a terminal. Delivery
//! goes through the dry-run gateway unless `--live` is passed, in which
//! case WhatsApp Cloud API credentials are read from the environment.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use consult_core::dispatch::prefilled_chat_link;
use consult_core::{
    ConsultationMonitor, ConsultationStatus, CoreConfig, DispatchService, DocKind, DocumentStore,
    DocumentUrls, IntakeRecord, LifecycleService, NotificationGateway, Provider,
};
use consult_gateway::{DryRunGateway, WhatsAppConfig, WhatsAppGateway};
use consult_types::{phone, NonEmptyText};

#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Consultation lifecycle and document dispatch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalise a raw phone number
    NormalizePhone {
        /// Phone number as entered by the patient
        raw: String,
    },
    /// Build a pre-filled chat link for manual sending
    ChatLink {
        /// Recipient phone number (any raw form)
        phone: String,
        /// Message to pre-fill
        message: String,
    },
    /// Run a promotion + dispatch scenario against an in-memory store
    Demo {
        /// Patient name
        #[arg(long, default_value = "Asha Mwangi")]
        patient_name: String,
        /// Patient phone number as entered on intake
        #[arg(long, default_value = "0700111222")]
        phone: String,
        /// Patient age
        #[arg(long)]
        age: Option<u32>,
        /// Service requested on intake
        #[arg(long, default_value = "General Consultation")]
        service: String,
        /// Presenting symptoms
        #[arg(long, default_value = "")]
        symptoms: String,
        /// Prescription document URL
        #[arg(long, default_value = "https://files.example/prescription.pdf")]
        prescription_url: String,
        /// Lab request document URL
        #[arg(long)]
        lab_request_url: Option<String>,
        /// Sick note document URL
        #[arg(long)]
        sick_note_url: Option<String>,
        /// Referral document URL
        #[arg(long)]
        referral_url: Option<String>,
        /// Medical report document URL
        #[arg(long)]
        medical_report_url: Option<String>,
        /// Document kinds to dispatch (comma-separated, e.g. prescription,lab-request)
        #[arg(long, value_delimiter = ',', default_value = "prescription")]
        send: Vec<String>,
        /// Acting provider display name
        #[arg(long, default_value = "Dr. Demo")]
        provider_name: String,
        /// Acting provider id
        #[arg(long, default_value = "provider-1")]
        provider_id: String,
        /// Deliver through the live WhatsApp gateway instead of the dry run
        #[arg(long)]
        live: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::NormalizePhone { raw } => {
            println!("{}", phone::canonicalise(&raw));
        }
        Commands::ChatLink {
            phone: raw,
            message,
        } => {
            let cfg = CoreConfig::default();
            let recipient = phone::canonicalise(&raw);
            println!(
                "{}",
                prefilled_chat_link(cfg.chat_link_base(), &recipient, &message)
            );
        }
        Commands::Demo {
            patient_name,
            phone,
            age,
            service,
            symptoms,
            prescription_url,
            lab_request_url,
            sick_note_url,
            referral_url,
            medical_report_url,
            send,
            provider_name,
            provider_id,
            live,
        } => {
            let selection = send
                .iter()
                .map(|raw| DocKind::from_str(raw))
                .collect::<Result<Vec<_>, _>>()?;

            let gateway: Arc<dyn NotificationGateway> = if live {
                Arc::new(WhatsAppGateway::new(whatsapp_config_from_env()?))
            } else {
                Arc::new(DryRunGateway)
            };

            let intake = IntakeRecord {
                id: "demo-1".into(),
                patient_name: NonEmptyText::new(&patient_name)
                    .context("patient name cannot be empty")?,
                age,
                phone,
                service,
                symptoms,
                allergies: String::new(),
                medical_history: String::new(),
                preferred_at: None,
                status: ConsultationStatus::Pending,
                assigned_to: None,
                documents: DocumentUrls {
                    prescription: Some(prescription_url),
                    lab_request: lab_request_url,
                    sick_note: sick_note_url,
                    referral: referral_url,
                    medical_report: medical_report_url,
                },
            };
            let acting = Provider {
                id: provider_id,
                name: NonEmptyText::new(&provider_name)
                    .context("provider name cannot be empty")?,
            };

            run_demo(intake, &selection, &acting, gateway).await?;
        }
    }

    Ok(())
}

async fn run_demo(
    intake: IntakeRecord,
    selection: &[DocKind],
    acting: &Provider,
    gateway: Arc<dyn NotificationGateway>,
) -> anyhow::Result<()> {
    let cfg = Arc::new(CoreConfig::default());
    let store = Arc::new(consult_core::MemoryStore::new());
    let record_id = intake.id.clone();
    store.put_intake(intake).await?;

    let mut monitor = ConsultationMonitor::attach(store.clone(), &record_id).await?;

    let lifecycle = LifecycleService::new(store.clone());
    lifecycle.promote(&record_id, None, acting).await?;

    let dispatch = DispatchService::new(cfg, store.clone(), gateway);
    let report = dispatch.dispatch(&record_id, selection, acting).await?;

    drain_updates(&mut monitor).await;

    println!("== view ==");
    println!("{}", serde_json::to_string_pretty(monitor.view())?);
    println!("== dispatch report ==");
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("== audit trail ==");
    let events = store.audit_events(&record_id).await?;
    println!("{}", serde_json::to_string_pretty(&events)?);

    monitor.detach();
    Ok(())
}

/// Pulls pending view updates until the monitor goes quiet.
async fn drain_updates(monitor: &mut ConsultationMonitor) {
    while let Ok(update) = tokio::time::timeout(Duration::from_millis(200), monitor.next()).await {
        if update.is_err() {
            break;
        }
    }
}

fn whatsapp_config_from_env() -> anyhow::Result<WhatsAppConfig> {
    let phone_id =
        std::env::var("WHATSAPP_PHONE_ID").context("WHATSAPP_PHONE_ID must be set for --live")?;
    let token =
        std::env::var("WHATSAPP_TOKEN").context("WHATSAPP_TOKEN must be set for --live")?;
    let mut cfg = WhatsAppConfig::new(phone_id, token);
    if let Ok(base) = std::env::var("WHATSAPP_API_BASE") {
        cfg = cfg.with_api_base(base);
    }
    Ok(cfg)
}
