//! PolyMesh CLI - polygon mesh editing from the command line.
//!
//! Usage: polymesh <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `polymesh --help` for available commands. Set `RUST_LOG=debug` for
//! details of what the kernel is doing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};

use polymesh::algo::subdivide::{refine_with_progress, SubdivisionOptions};
use polymesh::algo::unfold::{UnfoldJob, UnfoldOptions};
use polymesh::algo::Progress;
use polymesh::io;
use polymesh::mesh::{MirrorState, PolyMesh, SmoothingMethod};
use polymesh::ops::{ExtrudeOptions, MirrorOptions, Operation, QuadOptions};
use polymesh::session::EditSession;

#[derive(Parser)]
#[command(name = "polymesh")]
#[command(author, version, about = "Polygon mesh editing CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Check structural invariants
    Check {
        /// Input mesh file
        input: PathBuf,
    },

    /// Write the subdivided surface of a mesh
    Subdivide {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Subdivision level (default: the mesh's render level)
        #[arg(short, long)]
        level: Option<usize>,

        /// Subdivision method (default: the mesh's own)
        #[arg(short, long, value_enum)]
        method: Option<Method>,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Unfold a mesh along its seams
    Unfold {
        /// Input mesh file
        input: PathBuf,

        /// Write the flattened layout as a mesh
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Treat every creased edge as a seam
        #[arg(long)]
        crease_seams: bool,

        /// Control vertices to pin
        #[arg(long, value_delimiter = ',')]
        pins: Vec<usize>,

        /// Maximum relaxation iterations
        #[arg(short, long, default_value = "100")]
        iterations: usize,

        /// Relaxation tolerance
        #[arg(short, long, default_value = "1e-6")]
        tolerance: f64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Convert between file formats
    Convert {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,
    },

    /// Extrude faces
    Extrude {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Faces to extrude
        #[arg(short, long, value_delimiter = ',', required_unless_present = "all")]
        faces: Vec<usize>,

        /// Extrude every face
        #[arg(long)]
        all: bool,

        /// Keep adjacent faces connected
        #[arg(long)]
        region: bool,

        /// Extrusion distance
        #[arg(short, long, default_value = "1.0")]
        distance: f64,

        /// Scale of the new faces
        #[arg(short, long, default_value = "1.0")]
        scale: f64,
    },

    /// Mirror a mesh and weld it along the plane
    Mirror {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Mirror plane
        #[arg(short, long, value_enum, default_value = "yz")]
        plane: Plane,
    },

    /// Merge neighbouring triangles into quads
    Quads {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Prefer right-angled quads over removing long edges
        #[arg(long)]
        angular: bool,

        /// Largest fold between paired triangles, in degrees
        #[arg(long, default_value = "30")]
        max_fold: f64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Catmull-Clark style smoothing
    Approximating,
    /// Smoothing through the control points
    Interpolating,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Plane {
    /// Negate z
    Xy,
    /// Negate y
    Xz,
    /// Negate x
    Yz,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => cmd_info(&input)?,
        Commands::Check { input } => cmd_check(&input)?,
        Commands::Subdivide {
            input,
            output,
            level,
            method,
            sequential,
        } => cmd_subdivide(&input, &output, level, method, sequential)?,
        Commands::Unfold {
            input,
            layout,
            crease_seams,
            pins,
            iterations,
            tolerance,
            timeout,
            sequential,
        } => {
            let options = UnfoldOptions::default()
                .with_max_iterations(iterations)
                .with_tolerance(tolerance)
                .with_pins(pins)
                .with_parallel(!sequential);
            cmd_unfold(&input, layout.as_deref(), crease_seams, options, timeout)?;
        }
        Commands::Convert { input, output } => cmd_convert(&input, &output)?,
        Commands::Extrude {
            input,
            output,
            faces,
            all,
            region,
            distance,
            scale,
        } => cmd_extrude(&input, &output, &faces, all, region, distance, scale)?,
        Commands::Mirror { input, output, plane } => cmd_mirror(&input, &output, plane)?,
        Commands::Quads {
            input,
            output,
            angular,
            max_fold,
        } => {
            let mut options = QuadOptions::default().with_max_fold(max_fold.to_radians());
            if angular {
                options = options.angular();
            }
            cmd_quads(&input, &output, options)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Monotonic: relaxation of several pieces restarts sub-ranges.
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn load(input: &Path) -> Result<PolyMesh, Box<dyn std::error::Error>> {
    let mesh: PolyMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    Ok(mesh)
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: PolyMesh = io::load(input)?;
    let report = mesh.check_report();

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());
    println!("Surface area: {:.6}", mesh.surface_area());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    if mesh.is_triangle_mesh() {
        println!("Mesh type: Triangle mesh");
    } else if mesh.is_quad_mesh() {
        println!("Mesh type: Quad mesh");
    } else {
        println!("Mesh type: Mixed polygon mesh");
    }

    if report.boundary_loops == 0 {
        println!("Topology: Closed (euler {})", report.euler_characteristic());
    } else {
        println!(
            "Topology: Open ({} boundary loops, euler {})",
            report.boundary_loops,
            report.euler_characteristic()
        );
    }
    println!("Creased edges: {}", report.creased_edges);
    println!("Seams: {}", report.seams);
    println!("Smoothing: {:?}", mesh.smoothing_method());
    if !mesh.mirror_state().is_empty() {
        println!("Mirror: {:?}", mesh.mirror_state());
    }

    Ok(())
}

fn cmd_check(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: PolyMesh = io::load(input)?;
    let report = mesh.check_report();
    println!("{}", report);
    if !report.is_sound() {
        return Err(format!("{} structural problem(s)", report.problems.len()).into());
    }
    Ok(())
}

fn cmd_subdivide(
    input: &Path,
    output: &Path,
    level: Option<usize>,
    method: Option<Method>,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = load(input)?;

    let mut options = SubdivisionOptions::render(&mesh).with_parallel(!sequential);
    if let Some(level) = level {
        options.level = level;
    }
    if let Some(method) = method {
        options = options.with_method(match method {
            Method::Approximating => SmoothingMethod::Approximating,
            Method::Interpolating => SmoothingMethod::Interpolating,
        });
    }
    let mode = if sequential { "sequential" } else { "parallel" };
    println!("Subdividing to level {} ({})...", options.level, mode);

    let start = Instant::now();
    let refined = refine_with_progress(&mesh, &options, &create_progress())?;
    let elapsed = start.elapsed();

    println!("Result: {} vertices, {} faces", refined.mesh.num_vertices(), refined.mesh.num_faces());
    io::save(&refined.mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_unfold(
    input: &Path,
    layout: Option<&Path>,
    crease_seams: bool,
    options: UnfoldOptions,
    timeout: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = load(input)?;

    if crease_seams {
        let creased: Vec<_> = mesh
            .edge_ids()
            .filter(|&e| mesh.smoothness(mesh.edge_halfedge(e)) < 1.0)
            .collect();
        println!("Marking {} creased edges as seams", creased.len());
        for e in creased {
            mesh.set_seam(e, true);
        }
    }

    let start = Instant::now();
    let job = UnfoldJob::spawn(&mesh, options, create_progress());
    if let Some(limit) = timeout {
        let limit = Duration::from_secs_f64(limit.max(0.0));
        while !job.is_finished() {
            if start.elapsed() > limit {
                eprintln!();
                eprintln!("Timed out, cancelling");
                job.cancel();
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
    let result = job.join()?;
    let elapsed = start.elapsed();

    println!(
        "Unfolded {} pieces in {:.2?} (residual {:.3e}, {} iterations)",
        result.data.pieces.len(),
        elapsed,
        result.residual,
        result.iterations
    );
    for (i, piece) in result.data.pieces.iter().enumerate() {
        println!("  piece {}: {} vertices, {} triangles", i, piece.num_vertices(), piece.triangles.len());
    }

    if let Some(path) = layout {
        let flat: PolyMesh = result.data.flattened(0)?;
        io::save(&flat, path)?;
        println!("Saved layout: {}", path.display());
    }

    Ok(())
}

fn cmd_convert(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = load(input)?;
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_extrude(
    input: &Path,
    output: &Path,
    faces: &[usize],
    all: bool,
    region: bool,
    distance: f64,
    scale: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = load(input)?;

    let mut selection = vec![all; mesh.num_faces()];
    for &f in faces {
        let slot = selection
            .get_mut(f)
            .ok_or_else(|| format!("face {} does not exist", f))?;
        *slot = true;
    }

    let options = ExtrudeOptions::default().with_distance(distance).with_scale(scale);
    let op = if region {
        Operation::ExtrudeRegion(options)
    } else {
        Operation::ExtrudeFaces(options)
    };

    let mut session = EditSession::begin(&mesh);
    let result = session.apply(&op, &selection)?;
    session.commit(&mut mesh)?;

    let selected = result.iter().filter(|&&s| s).count();
    println!(
        "Result: {} vertices, {} faces ({} selected)",
        mesh.num_vertices(),
        mesh.num_faces(),
        selected
    );
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_mirror(input: &Path, output: &Path, plane: Plane) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = load(input)?;
    let plane = match plane {
        Plane::Xy => MirrorState::XY,
        Plane::Xz => MirrorState::XZ,
        Plane::Yz => MirrorState::YZ,
    };
    let selection = vec![false; mesh.num_faces()];
    Operation::MirrorWhole(MirrorOptions::default().with_plane(plane)).apply(&mut mesh, &selection)?;

    println!("Result: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_quads(input: &Path, output: &Path, options: QuadOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = load(input)?;
    let triangles = mesh.face_ids().filter(|&f| mesh.face_degree(f) == 3).count();
    let selection = vec![true; mesh.num_faces()];
    let quads = Operation::QuadsFromTriangles(options).apply(&mut mesh, &selection)?;

    let paired = quads.iter().filter(|&&s| s).count();
    println!("Paired {} of {} triangles into {} quads", paired * 2, triangles, paired);
    println!("Result: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}
