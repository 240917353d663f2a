use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bevy_math::Vec2;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use race_protocol::{EntryReport, Genome, GenomeFile, RoundEnd, RoundReport};
use racing::{
    Car, FeedForward, Fitness, Population, Round, TrackSurface, track_format::TrackFile,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Drive a population of feed-forward controllers around a track.
    Run {
        #[command(flatten)]
        track: TrackArg,
        /// Genome file written by an optimizer or `random-genomes`.
        #[arg(long, conflicts_with = "random")]
        genomes: Option<PathBuf>,
        /// Number of random controllers to generate instead of loading genomes.
        #[arg(long)]
        random: Option<usize>,
        #[command(flatten)]
        shape: RandomShape,
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        /// Stop a round after this many ticks even if cars are still driving.
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Write every round report to this JSON file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print radar readings and whisker state for a car placed on the track.
    Probe {
        #[command(flatten)]
        track: TrackArg,
        /// Defaults to the spawn point.
        #[arg(long, requires = "y")]
        x: Option<f32>,
        #[arg(long, requires = "x")]
        y: Option<f32>,
        #[arg(long)]
        heading: Option<f32>,
    },
    /// Write a genome file of random controllers.
    RandomGenomes {
        #[arg(long)]
        count: usize,
        #[command(flatten)]
        shape: RandomShape,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
struct TrackArg {
    /// Track description (TOML).
    #[arg(long = "track", env = "RACING_TRACK")]
    path: PathBuf,
}

#[derive(Debug, Args)]
struct RandomShape {
    #[arg(long)]
    seed: Option<u64>,
    /// Hidden layer widths, comma separated. `0` wires the radar straight to the outputs.
    #[arg(long, value_delimiter = ',', default_value = "4")]
    hidden: Vec<usize>,
}

impl RandomShape {
    fn rng(&self) -> StdRng {
        let seed = self.seed.unwrap_or_else(rand::random);
        info!(seed, "seeding random controllers");
        StdRng::seed_from_u64(seed)
    }

    fn controllers(&self, count: usize) -> Vec<FeedForward> {
        let mut rng = self.rng();
        (0..count as u64)
            .map(|id| FeedForward::random(&mut rng, id, &self.hidden))
            .collect()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "racing=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            track,
            genomes,
            random,
            shape,
            rounds,
            max_ticks,
            report,
        } => {
            let (file, surface) = load_track(&track.path)?;
            let controllers = match (genomes, random) {
                (Some(path), _) => load_controllers(&path)?,
                (None, Some(count)) => shape.controllers(count),
                (None, None) => bail!("either --genomes or --random is required"),
            };
            if controllers.is_empty() {
                warn!("no controllers given, every round ends immediately");
            }

            let stop = install_stop_handler()?;
            let reports = run_rounds(rounds, &file, &surface, &controllers, max_ticks, &stop)?;

            if let Some(path) = report {
                let text = serde_json::to_string_pretty(&reports)?;
                std::fs::write(&path, text)
                    .wrap_err_with(|| format!("failed to write report {}", path.display()))?;
                info!(path = %path.display(), "report written");
            }
        }
        Commands::Probe {
            track,
            x,
            y,
            heading,
        } => {
            let (file, surface) = load_track(&track.path)?;
            let position = match (x, y) {
                (Some(x), Some(y)) => Vec2::new(x, y),
                _ => file.spawn_position(),
            };
            let heading = heading.unwrap_or(file.spawn.heading_deg);
            let mut car = Car::new(position, heading, file.car);

            let crashed = car.sense(&surface);
            println!(
                "position ({:.1}, {:.1}) heading {:.1}",
                car.position().x,
                car.position().y,
                car.heading_deg()
            );
            for reading in car.readings() {
                println!("  radar {:>4}°  {:>3}", reading.angle_deg, reading.distance);
            }
            let [left, right] = car.probe_points();
            println!(
                "  whiskers left ({:.1}, {:.1}) right ({:.1}, {:.1}) {}",
                left.x,
                left.y,
                right.x,
                right.y,
                if crashed { "HIT" } else { "clear" }
            );
        }
        Commands::RandomGenomes { count, shape, out } => {
            let genomes: Vec<Genome> = shape
                .controllers(count)
                .iter()
                .map(FeedForward::to_genome)
                .collect();
            let text = serde_json::to_string_pretty(&GenomeFile::new(genomes))?;
            std::fs::write(&out, text)
                .wrap_err_with(|| format!("failed to write {}", out.display()))?;
            info!(count, path = %out.display(), "genomes written");
        }
    }

    Ok(())
}

fn load_track(path: &Path) -> Result<(TrackFile, TrackSurface)> {
    let file = TrackFile::load(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let surface = file
        .load_surface(base_dir)
        .wrap_err_with(|| format!("failed to load surface for track {}", path.display()))?;
    info!(
        name = %file.metadata.name,
        width = surface.width(),
        height = surface.height(),
        "track loaded"
    );
    Ok((file, surface))
}

fn load_controllers(path: &Path) -> Result<Vec<FeedForward>> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read genomes {}", path.display()))?;
    let file: GenomeFile = serde_json::from_str(&text)
        .wrap_err_with(|| format!("failed to parse genomes {}", path.display()))?;
    if file.version != race_protocol::PROTOCOL_VERSION {
        warn!(version = %file.version, "unexpected genome file version");
    }
    file.genomes
        .iter()
        .map(|genome| FeedForward::from_genome(genome).map_err(|err| eyre!(err)))
        .collect()
}

/// Raises the returned flag on Ctrl-C. Rounds notice it between ticks.
fn install_stop_handler() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .wrap_err("failed to start signal runtime")?;
    let flag = stop.clone();
    std::thread::spawn(move || {
        runtime.block_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("interrupt received, stopping after the current tick");
                    flag.store(true, Ordering::Relaxed);
                }
                Err(err) => warn!(%err, "failed to listen for interrupt"),
            }
        });
    });
    Ok(stop)
}

/// Runs up to `rounds` rounds, printing each report as a JSON line. A round
/// that ends on the stop signal is the last one.
fn run_rounds(
    rounds: u32,
    file: &TrackFile,
    surface: &TrackSurface,
    controllers: &[FeedForward],
    max_ticks: Option<u64>,
    stop: &AtomicBool,
) -> Result<Vec<RoundReport>> {
    let mut reports = Vec::with_capacity(rounds as usize);
    for round in 1..=rounds {
        let report = run_round(round, file, surface, controllers, max_ticks, stop);
        println!("{}", serde_json::to_string(&report)?);
        let stopped = report.end == RoundEnd::Stopped;
        reports.push(report);
        if stopped {
            info!(round, "stopped, skipping remaining rounds");
            break;
        }
    }
    Ok(reports)
}

/// One round from a fresh population: every controller gets a new car at
/// the spawn point and a zeroed fitness.
fn run_round(
    round: u32,
    file: &TrackFile,
    surface: &TrackSurface,
    controllers: &[FeedForward],
    max_ticks: Option<u64>,
    stop: &AtomicBool,
) -> RoundReport {
    let mut population = Population::new();
    let mut entries = Vec::with_capacity(controllers.len());
    for controller in controllers {
        let fitness = Fitness::new();
        entries.push((controller.id(), fitness.clone()));
        population.push(file.spawn_car(), controller.clone(), fitness);
    }

    let mut runner = Round::new(surface);
    if let Some(limit) = max_ticks {
        runner = runner.with_tick_limit(limit);
    }
    let outcome = runner.run(&mut population, stop);

    let report = RoundReport {
        round,
        ticks: outcome.ticks,
        end: outcome.end,
        entries: entries
            .into_iter()
            .map(|(genome_id, fitness)| EntryReport {
                genome_id,
                fitness: fitness.get(),
            })
            .collect(),
    };
    if let Some(best) = report.best() {
        info!(round, genome = best.genome_id, fitness = best.fitness, "best of round");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use racing::track::DEFAULT_BOUNDARY_COLOR;

    fn open_arena() -> (TrackFile, TrackSurface) {
        let mut file = TrackFile::new("arena.png");
        file.spawn.position = [300.0, 300.0];
        let surface = TrackSurface::new(
            RgbImage::from_pixel(600, 600, image::Rgb([30, 30, 30])),
            DEFAULT_BOUNDARY_COLOR,
        );
        (file, surface)
    }

    fn controllers(count: usize) -> Vec<FeedForward> {
        let mut rng = StdRng::seed_from_u64(11);
        (0..count as u64)
            .map(|id| FeedForward::random(&mut rng, id, &[3]))
            .collect()
    }

    #[test]
    fn stopped_round_ends_the_run_but_keeps_its_report() {
        let (file, surface) = open_arena();
        let stop = AtomicBool::new(true);
        let reports = run_rounds(3, &file, &surface, &controllers(4), None, &stop).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].end, RoundEnd::Stopped);
        assert_eq!(reports[0].ticks, 0);
        assert_eq!(reports[0].entries.len(), 4);
    }

    #[test]
    fn every_round_runs_without_a_stop() {
        let (file, surface) = open_arena();
        let stop = AtomicBool::new(false);
        let reports = run_rounds(3, &file, &surface, &controllers(2), Some(20), &stop).unwrap();

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.end != RoundEnd::Stopped));
        let rounds: Vec<u32> = reports.iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);
        // Fresh populations of the same controllers score the same each round.
        assert_eq!(reports[0].entries, reports[2].entries);
    }
}
