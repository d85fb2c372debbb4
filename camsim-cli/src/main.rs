use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use camsim_core::{Camera, CameraConfig, CameraError, EulerOrder, Projection};
use clap::{Parser, Subcommand};
use log::info;
use ndarray::Array2;
use serde::Serialize;

/// Project world points through calibrated camera models
#[derive(Parser, Debug)]
#[command(name = "camsim", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project a JSON list of [x, y, z] world points
    Project {
        /// Camera description (JSON)
        #[arg(short, long)]
        camera: PathBuf,
        /// Points as a JSON array of [x, y, z]
        #[arg(short, long)]
        points: PathBuf,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the world-to-camera matrix
    Extrinsic {
        #[arg(short, long)]
        camera: PathBuf,
        /// Also decompose into Euler angles, e.g. XYZ or zyx
        #[arg(long)]
        order: Option<String>,
    },
    /// Print the intrinsic matrix
    Intrinsic {
        #[arg(short, long)]
        camera: PathBuf,
    },
}

#[derive(Serialize)]
struct ProjectionReport {
    pixels: Vec<[f64; 2]>,
    in_front: Vec<bool>,
    inside_image: Vec<bool>,
    invalid: Vec<bool>,
}

impl From<&Projection> for ProjectionReport {
    fn from(projection: &Projection) -> Self {
        Self {
            pixels: projection
                .pixels
                .columns()
                .into_iter()
                .map(|p| [p[0], p[1]])
                .collect(),
            in_front: projection.in_front.to_vec(),
            inside_image: projection.inside_image.to_vec(),
            invalid: projection.invalid.to_vec(),
        }
    }
}

fn load_camera(path: &Path) -> Result<Box<dyn Camera>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read camera file {}", path.display()))?;
    let config: CameraConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse camera file {}", path.display()))?;
    Ok(config.build()?)
}

fn load_points(path: &Path) -> Result<Array2<f64>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read points file {}", path.display()))?;
    let points: Vec<[f64; 3]> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse points file {}", path.display()))?;
    Ok(Array2::from_shape_fn((3, points.len()), |(r, c)| points[c][r]))
}

fn print_rows(rows: impl Iterator<Item = Vec<f64>>) {
    for row in rows {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>12.6}")).collect();
        println!("{}", cells.join(" "));
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Project {
            camera,
            points,
            output,
        } => {
            let camera = load_camera(&camera)?;
            let points = load_points(&points)?;
            info!("projecting {} points", points.ncols());

            let projection = camera.world_to_camera(points.view())?;
            let report = serde_json::to_string_pretty(&ProjectionReport::from(&projection))?;
            match output {
                Some(path) => fs::write(&path, report)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{report}"),
            }
        }
        Command::Extrinsic { camera, order } => {
            let camera = load_camera(&camera)?;
            let extrinsic = camera.extrinsic_matrix();
            print_rows(extrinsic.row_iter().map(|r| r.iter().copied().collect()));

            if let Some(order) = order {
                let order: EulerOrder = order.parse()?;
                let (angles, translation) = camera.extrinsic_as_euler(order);
                println!(
                    "euler {order} [deg]: {:.6} {:.6} {:.6}",
                    angles[0], angles[1], angles[2]
                );
                println!(
                    "translation: {:.6} {:.6} {:.6}",
                    translation.x, translation.y, translation.z
                );
            }
        }
        Command::Intrinsic { camera } => {
            let camera = load_camera(&camera)?;
            match camera.intrinsic_matrix() {
                Ok(k) => print_rows(k.row_iter().map(|r| r.iter().copied().collect())),
                Err(CameraError::UnsupportedOperation(reason)) => {
                    bail!("camera has no intrinsic matrix: {reason}")
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize `env_logger`.
    env_logger::init();

    run(Cli::parse())
}
