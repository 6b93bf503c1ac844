use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fluxgraph", version)]
struct Cli {
    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log: tracing::Level,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the fluid solver headless and write the dye field as a PNG.
    Simulate(SimulateArgs),
    /// Print the fluid pipeline's evaluation order.
    Graph(GraphArgs),
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Fluid configuration JSON (camelCase keys).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to render.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Time step override in seconds.
    #[arg(long)]
    dt: Option<f32>,

    /// Splat applied on the first frame as `x,y,dx,dy,r,g,b` (repeatable).
    ///
    /// `x,y` are normalized grid coordinates. Defaults to one upward splat at the center.
    #[arg(long = "splat", value_parser = parse_splat, allow_hyphen_values = true)]
    splats: Vec<SplatArg>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Fluid configuration JSON (camelCase keys).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SplatArg {
    point: fluxgraph::Point,
    delta: fluxgraph::Vec2,
    color: [f32; 3],
}

fn parse_splat(s: &str) -> Result<SplatArg, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in splat '{s}': {e}"))?;
    let [x, y, dx, dy, r, g, b] = parts[..] else {
        return Err(format!(
            "splat '{s}' must have 7 comma-separated values: x,y,dx,dy,r,g,b"
        ));
    };
    Ok(SplatArg {
        point: fluxgraph::Point::new(f64::from(x), f64::from(y)),
        delta: fluxgraph::Vec2::new(f64::from(dx), f64::from(dy)),
        color: [r, g, b],
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
        Command::Graph(args) => cmd_graph(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<fluxgraph::FluidConfig> {
    match path {
        Some(p) => fluxgraph::FluidConfig::from_json_file(p)
            .with_context(|| format!("load fluid config '{}'", p.display())),
        None => Ok(fluxgraph::FluidConfig::default()),
    }
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let cfg = read_config(args.config.as_deref())?;
    let mut sim = fluxgraph::FluidSimulation::new(cfg).context("build fluid pipeline")?;
    if let Some(dt) = args.dt {
        sim.advance_frame(dt)?;
    }

    let splats = if args.splats.is_empty() {
        vec![SplatArg {
            point: fluxgraph::Point::new(0.5, 0.5),
            delta: fluxgraph::Vec2::new(0.0, -0.02),
            color: [1.0, 0.45, 0.1],
        }]
    } else {
        args.splats
    };
    for s in &splats {
        sim.apply_splat(s.point, s.delta, s.color, None)?;
    }

    for frame in 0..args.frames {
        sim.render_all()
            .with_context(|| format!("render frame {frame}"))?;
    }

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    sim.dye_rgba8()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} after {} frames (max divergence {:.4})",
        args.out.display(),
        sim.frame().0,
        sim.divergence()?.max_abs(0)
    );
    sim.dispose()?;
    Ok(())
}

fn cmd_graph(args: GraphArgs) -> anyhow::Result<()> {
    let cfg = read_config(args.config.as_deref())?;
    let sim = fluxgraph::FluidSimulation::new(cfg).context("build fluid pipeline")?;
    print!("{}", sim.dump_order()?);
    Ok(())
}
