use std::{path::PathBuf, process::ExitCode};

use bevy::{log::LogPlugin, prelude::*};
use clap::Parser;

use hover_popup::{
    data::config::HoverPopupConfig,
    scenes::{replay, PopupScene, ScenePlugin},
    systems::popup::{HoverPopupBindings, HoverPopupPlugin},
};

/// Replays pointer scripts against hover-popup markup.
#[derive(Parser, Debug)]
#[command(name = "hover-popup", version)]
struct Cli {
    /// Scene file (markup, bindings and pointer script). Runs the built-in
    /// tooltip demo when omitted.
    scene: Option<PathBuf>,

    /// Popup configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra selectors to bind, on top of the scene's own.
    #[arg(long = "bind", value_name = "SELECTOR")]
    bind: Vec<String>,

    /// Print the step reports as JSON instead of one line per step.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut app = App::new();
    app.add_plugins(LogPlugin::default());

    let scene = match &cli.scene {
        Some(path) => PopupScene::from_file(path),
        None => PopupScene::demo(),
    };
    let scene = match scene {
        Ok(scene) => scene,
        Err(error) => {
            error!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let config = HoverPopupConfig::load_or_default(cli.config.as_deref());
    let marker_class = config.marker_class.clone();
    let script = scene.script.clone();

    app.insert_resource(config)
        .insert_resource(HoverPopupBindings(cli.bind))
        .add_plugins((HoverPopupPlugin, ScenePlugin { scene }));
    app.update();

    let reports = replay(app.world_mut(), &script, &marker_class);
    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                error!("failed to encode report: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for report in &reports {
            println!("{report}");
        }
    }

    ExitCode::SUCCESS
}
