use clap::{Parser, Subcommand};
use obsbot_control::{
    config::Config,
    model::types::{FocusMode, FovType, MediaMode, WhiteBalanceType},
    sdk::SimulatedSdk,
    CameraControl, ObsbotError, ObsbotResult,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Parse a mode name such as `virtual-background` into one of the model enums
fn parse_name<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.replace('-', "_")))
        .map_err(|_| format!("unknown value `{raw}`"))
}

fn parse_toggle(raw: &str) -> Result<bool, String> {
    match raw {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on or off, got `{other}`")),
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Parser)]
#[command(name = "obsbot-ctl", about = "Control OBSBOT cameras", version)]
struct Cli {
    /// Config file, defaults to the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index of the camera to control, as printed by `list`
    #[arg(long, short, global = true)]
    device: Option<usize>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List attached cameras
    List,
    /// Print the readable settings of the selected camera
    Status,
    /// Move the gimbal to absolute angles in degrees
    #[command(allow_negative_numbers = true)]
    Gimbal {
        yaw: f32,
        pitch: f32,
        #[arg(default_value_t = 0.0)]
        roll: f32,
    },
    /// Move the gimbal in one direction as if a button were held
    Nudge {
        #[arg(value_parser = parse_name::<Direction>)]
        direction: Direction,
        /// How long to keep moving
        #[arg(long, default_value_t = 500)]
        hold_ms: u64,
    },
    /// Turn AI tracking on or off
    Track {
        #[arg(value_parser = parse_toggle)]
        enable: bool,
    },
    /// Set the zoom ratio (1.0 to 4.0)
    Zoom { level: f32 },
    /// Set the field of view: wide, medium or narrow
    Fov {
        #[arg(value_parser = parse_name::<FovType>)]
        fov: FovType,
    },
    #[command(subcommand)]
    Focus(FocusCmd),
    Hdr {
        #[arg(value_parser = parse_toggle)]
        enable: bool,
    },
    /// Set white balance: auto, daylight, fluorescent, tungsten or manual
    WhiteBalance {
        #[arg(value_parser = parse_name::<WhiteBalanceType>)]
        mode: WhiteBalanceType,
        /// Colour temperature used in manual mode
        #[arg(long, default_value_t = 5000)]
        temperature: i32,
    },
    /// Set media mode: normal, virtual-background or auto-frame
    Media {
        #[arg(value_parser = parse_name::<MediaMode>)]
        mode: MediaMode,
    },
    #[command(subcommand)]
    Preset(PresetCmd),
}

#[derive(Subcommand)]
enum FocusCmd {
    /// auto, continuous-af, single-af or manual
    Mode {
        #[arg(value_parser = parse_name::<FocusMode>)]
        mode: FocusMode,
    },
    /// Manual focus position (0 to 100)
    Manual { position: i32 },
    /// Focus on detected faces
    Face {
        #[arg(value_parser = parse_toggle)]
        enable: bool,
    },
}

#[derive(Subcommand)]
enum PresetCmd {
    Save { id: i32, name: String },
    Recall { id: i32 },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ObsbotResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_or_default(path)?,
        None => Config::load_or_default()?,
    };

    let sdk = Arc::new(SimulatedSdk::with_devices(
        config.simulated_devices.iter().cloned(),
    ));
    let control = CameraControl::from_config(sdk, &config);
    control.initialize().await?;
    control.scan_for_devices().await?;

    if let Cmd::List = cli.command {
        for (index, device) in control.devices().await.iter().enumerate() {
            println!("{index}: {} [{}]", device.name, device.serial);
        }
        return Ok(());
    }

    select(&control, cli.device).await?;

    match cli.command {
        Cmd::List => {}
        Cmd::Status => print_status(&control).await,
        Cmd::Gimbal { yaw, pitch, roll } => control.move_gimbal(yaw, pitch, roll).await?,
        Cmd::Nudge { direction, hold_ms } => {
            let step = config.speed_step;
            let (yaw, pitch) = match direction {
                Direction::Left => (-step, 0.0),
                Direction::Right => (step, 0.0),
                Direction::Up => (0.0, step),
                Direction::Down => (0.0, -step),
            };
            control.move_gimbal_by_speed(yaw, pitch).await?;
            tokio::time::sleep(Duration::from_millis(hold_ms)).await;
            control.stop_gimbal().await?;
        }
        Cmd::Track { enable } => control.enable_ai_tracking(enable).await?,
        Cmd::Zoom { level } => control.set_zoom(level).await?,
        Cmd::Fov { fov } => control.set_fov(fov).await?,
        Cmd::Focus(FocusCmd::Mode { mode }) => control.set_auto_focus_mode(mode).await?,
        Cmd::Focus(FocusCmd::Manual { position }) => {
            control.set_manual_focus_position(position).await?
        }
        Cmd::Focus(FocusCmd::Face { enable }) => control.set_face_focus(enable).await?,
        Cmd::Hdr { enable } => control.set_hdr(enable).await?,
        Cmd::WhiteBalance { mode, temperature } => {
            control.set_white_balance(mode, temperature).await?
        }
        Cmd::Media { mode } => control.set_media_mode(mode).await?,
        Cmd::Preset(PresetCmd::Save { id, name }) => control.save_preset(id, &name).await?,
        Cmd::Preset(PresetCmd::Recall { id }) => control.move_to_preset(id).await?,
    }
    Ok(())
}

/// Select the requested camera, else keep the configured default, else take the first
async fn select(control: &CameraControl, index: Option<usize>) -> ObsbotResult<()> {
    match index {
        Some(index) => {
            if !control.select_device(index).await {
                return Err(ObsbotError::DeviceUnavailable(format!(
                    "no usable camera at index {index}"
                )));
            }
        }
        None if control.selected_device().await.is_some() => {}
        None => {
            if !control.select_device(0).await {
                return Err(ObsbotError::DeviceUnavailable(
                    "no camera attached".to_owned(),
                ));
            }
        }
    }
    Ok(())
}

async fn print_status(control: &CameraControl) {
    fn field<T: serde::Serialize>(result: ObsbotResult<T>) -> serde_json::Value {
        match result {
            Ok(value) => json!(value),
            Err(e) => json!({ "error": e.to_string() }),
        }
    }

    let status = json!({
        "device": control.selected_device().await,
        "zoom": field(control.zoom().await),
        "auto_focus_mode": field(control.auto_focus_mode().await),
        "manual_focus_position": field(control.manual_focus_position().await),
        "hdr": field(control.hdr().await),
        "white_balance": field(control.white_balance_type().await),
    });
    match serde_json::to_string_pretty(&status) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => error!("failed to render status: {e}"),
    }
}
