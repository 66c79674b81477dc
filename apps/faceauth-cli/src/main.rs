use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use faceauth_camera::{CameraConstraints, CameraController};
use faceauth_capture::FrameCapturer;
use faceauth_client::{AdminClient, HttpSubmissionClient, UserDirectory};
use faceauth_flow::{AuthDashboard, OperationForm, StatusFeed};
use faceauth_ops::{init_tracing, StatusLog};
use faceauth_types::{
    config::{CameraSource, FaceAuthConfig},
    status::StatusState,
};
use tokio::time::Duration;
use tracing::info;

mod camera;

use camera::ConfiguredCamera;

#[derive(Parser, Debug)]
#[command(name = "faceauth", about = "Capture a face and enroll or verify it")]
struct Args {
    /// Path to a TOML config file
    #[arg(long, env = "FACEAUTH_CONFIG", default_value = "configs/dev.toml")]
    config: String,

    /// Use this image file as the camera instead of the configured source
    #[arg(long, global = true)]
    image: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a face for a new user
    Enroll {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        full_name: String,
    },

    /// Check a face against an enrolled user
    Verify {
        #[arg(long)]
        user_id: String,
    },

    /// List enrolled users
    Users,

    /// Remove an enrolled user
    Delete {
        #[arg(long)]
        user_id: String,
    },

    /// Start the camera once, enroll, then verify the same user
    Session {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        full_name: String,
    },
}

type Dashboard = AuthDashboard<ConfiguredCamera, HttpSubmissionClient>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(&args.config);
    if let Some(path) = &args.image {
        config.camera.source = CameraSource::StillImage { path: path.clone() };
    }
    config.apply_env_overrides();
    config.validate()?;
    init_tracing(&config.ops)?;
    info!("Using backend at {}", config.api.base_url);

    match args.command {
        Command::Enroll { user_id, full_name } => {
            let form = OperationForm::enroll()
                .with_user_id(user_id)
                .with_full_name(full_name);
            run_operations(&config, vec![form]).await
        }
        Command::Verify { user_id } => {
            let form = OperationForm::verify().with_user_id(user_id);
            run_operations(&config, vec![form]).await
        }
        Command::Session { user_id, full_name } => {
            let forms = vec![
                OperationForm::enroll()
                    .with_user_id(user_id.clone())
                    .with_full_name(full_name),
                OperationForm::verify().with_user_id(user_id),
            ];
            run_operations(&config, forms).await
        }
        Command::Users => {
            let admin = AdminClient::new(&config.api)?;
            let mut directory = UserDirectory::new();
            for user in directory.refresh(&admin).await? {
                println!("{user}");
            }
            Ok(())
        }
        Command::Delete { user_id } => {
            let admin = AdminClient::new(&config.api)?;
            let mut directory = UserDirectory::new();
            directory.refresh(&admin).await?;
            let ack = directory.delete(&admin, &user_id).await?;
            println!("{ack}");
            println!("{} users remain", directory.users().len());
            Ok(())
        }
    }
}

/// Opens the camera, submits each form in order, and closes the camera again.
async fn run_operations(config: &FaceAuthConfig, forms: Vec<OperationForm>) -> Result<()> {
    let mut dashboard = build_dashboard(config)?;

    let started = dashboard
        .start_camera(CameraConstraints::from(&config.camera))
        .await;
    println!("{started}");
    if started.is_error() {
        bail!(started.message);
    }

    let mut failed: Option<StatusState> = None;
    for mut form in forms {
        let status = dashboard.submit(&mut form).await;
        println!("{status}");
        if status.is_error() {
            failed = Some(status);
            break;
        }
    }

    println!("{}", dashboard.stop_camera().await);
    let metrics = dashboard.capturer().metrics();
    info!(
        "Captured {} frames, {} encode failures",
        metrics.frames_captured, metrics.encode_failures
    );

    match failed {
        Some(status) => bail!(status.message),
        None => Ok(()),
    }
}

fn build_dashboard(config: &FaceAuthConfig) -> Result<Dashboard> {
    let camera = CameraController::new(ConfiguredCamera::from_source(&config.camera.source));
    let client = HttpSubmissionClient::new(&config.api)?;
    Ok(AuthDashboard::new(
        camera,
        Arc::new(client),
        Arc::new(FrameCapturer::jpeg(config.capture.jpeg_quality)),
        StatusFeed::default(),
        StatusLog::from_config(&config.ops),
        Duration::from_millis(config.camera.preview_interval_ms),
    ))
}

fn load_config(path: &str) -> FaceAuthConfig {
    match FaceAuthConfig::from_file(path) {
        Ok(cfg) => match cfg.validate() {
            Ok(()) => cfg,
            Err(err) => {
                eprintln!("Invalid config in '{path}': {err}. Falling back to internal defaults.");
                FaceAuthConfig::default()
            }
        },
        Err(err) => {
            eprintln!("Failed to load config from '{path}': {err}. Falling back to internal defaults.");
            FaceAuthConfig::default()
        }
    }
}
