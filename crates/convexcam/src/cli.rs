use std::path::PathBuf;

use camera::Facing;
use capture::FallbackPolicy;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "convexcam",
    author,
    version,
    about = "Live camera seen through a convex mirror",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Configuration file to use instead of the one in the config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Camera to open first: `user` (front) or `environment` (back).
    #[arg(long, value_name = "FACING", value_parser = parse_facing)]
    pub facing: Option<Facing>,

    /// Starting lens curvature (0.0-1.0).
    #[arg(long, value_name = "AMOUNT")]
    pub curvature: Option<f32>,

    /// Starting zoom factor.
    #[arg(long, value_name = "FACTOR")]
    pub zoom: Option<f32>,

    /// Lens radius in plane units.
    #[arg(long, value_name = "RADIUS")]
    pub radius: Option<f32>,

    /// What to do with a capture when sharing is unavailable or declined.
    #[arg(long, value_name = "download|preview", value_parser = parse_fallback)]
    pub fallback: Option<FallbackPolicy>,

    /// Directory captures are saved to.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Share command, one argument per flag (`{file}`, `{title}`, `{text}` are expanded).
    #[arg(long = "share-command", value_name = "ARG", allow_hyphen_values = true)]
    pub share_command: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Distort a still image through the lens and save it as JPEG.
    Render(RenderArgs),
    /// List the cameras the platform reports.
    Devices,
    /// Inspect the configuration file.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Image to distort (PNG or JPEG).
    #[arg(long, short, value_name = "IMG")]
    pub input: PathBuf,

    /// Where to write the JPEG result.
    #[arg(long, short, value_name = "OUT")]
    pub output: PathBuf,

    /// Output size; defaults to the input size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    #[arg(long, value_name = "AMOUNT")]
    pub curvature: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub zoom: Option<f32>,

    #[arg(long, value_name = "RADIUS")]
    pub radius: Option<f32>,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the config file location and the capture download directory.
    Where,
    /// Print the effective configuration as TOML.
    Show,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;

    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_facing(value: &str) -> Result<Facing, String> {
    value.parse()
}

pub fn parse_fallback(value: &str) -> Result<FallbackPolicy, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_accepts_common_separators() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 800 X 600 "), Ok((800, 600)));
        assert_eq!(parse_size("640×480"), Ok((640, 480)));
    }

    #[test]
    fn size_rejects_bad_input() {
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn facing_and_fallback_parse_case_insensitively() {
        assert_eq!(parse_facing("Back"), Ok(Facing::Environment));
        assert_eq!(parse_fallback("PREVIEW"), Ok(FallbackPolicy::Preview));
        assert!(parse_fallback("email").is_err());
    }

    #[test]
    fn share_command_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "convexcam",
            "--share-command",
            "notify-send",
            "--share-command",
            "{title}",
            "--share-command",
            "-i",
        ])
        .unwrap();
        assert_eq!(cli.run.share_command, vec!["notify-send", "{title}", "-i"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn config_flag_applies_to_subcommands() {
        let cli = Cli::try_parse_from(["convexcam", "config", "show", "--config", "/tmp/c.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Show
            }))
        ));
    }

    #[test]
    fn render_requires_input_and_output() {
        assert!(Cli::try_parse_from(["convexcam", "render", "--input", "a.png"]).is_err());
        let cli = Cli::try_parse_from([
            "convexcam", "render", "-i", "a.png", "-o", "b.jpg", "--size", "64x48",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Render(args)) => {
                assert_eq!(args.size, Some((64, 48)));
                assert_eq!(args.output, PathBuf::from("b.jpg"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
