use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use marquee_core::core::machine::Machine;
use marquee_machines::{RomRegions, registry};

mod config;
mod image;
mod rom_path;
mod scene;

use config::Config;
use image::{SheetColors, gfx_sheet};
use scene::Scene;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(version, about = "Arcade raster video and sound boards, driven from scripted bus traffic")]
struct Cli {
    /// Config file (defaults to marquee/marquee.toml in the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// PNG upscale factor (overrides the config file)
    #[arg(long, global = true)]
    scale: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered boards and the regions they read
    List,

    /// Draw a board's decoded graphics sets as a sheet
    Gfx {
        /// Board name, as shown by `list`
        machine: String,

        /// ZIP or directory of region dumps
        #[arg(long)]
        regions: Option<PathBuf>,

        /// Colour code to draw every set in
        #[arg(long, default_value_t = 0)]
        color: usize,

        /// Ignore the palette and draw raw pixel values as grey levels
        #[arg(long)]
        grayscale: bool,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Replay a scene file and write the composed frame
    Scene {
        /// Scene description (TOML)
        file: PathBuf,

        #[arg(short, long)]
        out: PathBuf,

        /// Also write the scene's audio as mono little-endian i16 PCM
        #[arg(long)]
        audio: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("marquee: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config.as_deref())?;
    let scale = cli.scale.unwrap_or(config.scale).max(1) as usize;

    match cli.command {
        Commands::List => list(),
        Commands::Gfx {
            machine,
            regions,
            color,
            grayscale,
            out,
        } => {
            let entry = registry::find(&machine).ok_or_else(|| unknown_machine(&machine))?;
            let regions = resolve_regions(&machine, regions.as_deref(), &config)?;
            let board: Box<dyn Machine> = (entry.create)(&regions)?;
            let colors = if grayscale {
                SheetColors::Grayscale
            } else {
                SheetColors::Palette(color)
            };
            let sheet = gfx_sheet(board.gfx(), board.palette(), colors);
            if sheet.width == 0 {
                log::warn!("{machine} has no decoded graphics");
            }
            sheet.scaled(scale).write_png(&out)?;
        }
        Commands::Scene { file, out, audio } => {
            let scene = Scene::load(&file)?;
            let regions = resolve_regions(&scene.machine, scene.regions.as_deref(), &config)?;
            let mut board = scene.create_machine(&regions)?;
            let output = scene.play(board.as_mut());
            output.frame.scaled(scale).write_png(&out)?;
            if let Some(path) = audio {
                if output.sample_rate == 0 {
                    log::warn!("{} has no sound emulation; writing silence", scene.machine);
                }
                scene::write_pcm(&path, &output.audio)?;
                log::info!(
                    "wrote {} samples at {} Hz to {}",
                    output.audio.len(),
                    output.sample_rate,
                    path.display()
                );
            }
        }
    }
    Ok(())
}

fn list() {
    for entry in registry::all() {
        let regions: Vec<String> = entry
            .regions
            .iter()
            .map(|r| {
                if r.required {
                    format!("{}:{:#x}", r.name, r.size)
                } else {
                    format!("[{}:{:#x}]", r.name, r.size)
                }
            })
            .collect();
        println!("{:<10} {:<24} {}", entry.name, entry.description, regions.join(" "));
    }
}

fn unknown_machine(name: &str) -> String {
    let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
    format!("unknown machine: {name} (available: {})", names.join(", "))
}

/// An explicit path wins; otherwise the configured regions directory. With
/// neither, the board gets no regions and reports what it is missing.
fn resolve_regions(
    machine: &str,
    explicit: Option<&Path>,
    config: &Config,
) -> Result<RomRegions, marquee_machines::MachineError> {
    match explicit.or(config.regions_dir.as_deref()) {
        Some(path) => rom_path::load_regions(machine, path),
        None => {
            log::warn!("no region path given for {machine}");
            Ok(RomRegions::new())
        }
    }
}
