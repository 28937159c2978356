use beer_sim_core::{Acceleration, BeerSimulator, SimulatorConfig, STANDARD_GRAVITY};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Headless beer sloshing demo driven by a synthetic accelerometer
#[derive(Parser, Debug)]
#[command(name = "beer-sim-demo")]
#[command(about = "Tilt-driven beer sloshing simulation without a display", long_about = None)]
struct Args {
    /// Grid width in cells
    #[arg(long, default_value_t = 300)]
    width: u32,

    /// Grid height in cells
    #[arg(long, default_value_t = 500)]
    height: u32,

    /// Simulation duration in seconds
    #[arg(short, long, default_value_t = 10.0)]
    duration: f32,

    /// Accelerometer sample rate in Hz
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Steady acceleration along device x (m/s²)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    tilt_x: f32,

    /// Steady acceleration along device y (m/s², 9.81 = held upright)
    #[arg(long, default_value_t = STANDARD_GRAVITY, allow_hyphen_values = true)]
    tilt_y: f32,

    /// Steady acceleration along device z (m/s²)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    tilt_z: f32,

    /// Amplitude of a sideways rocking motion added to x (m/s²)
    #[arg(short, long, default_value_t = 3.0)]
    slosh: f32,

    /// Period of the rocking motion in seconds
    #[arg(long, default_value_t = 1.5)]
    slosh_period: f32,

    /// Uniform sensor noise amplitude (m/s²)
    #[arg(short, long, default_value_t = 0.2)]
    noise: f32,

    /// Relative jitter applied to each frame interval (0-1)
    #[arg(long, default_value_t = 0.1)]
    jitter: f32,

    /// Random seed for noise and jitter
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 1.0)]
    report_interval: f32,

    /// Physics preset (beer, calm, lively)
    #[arg(short = 'p', long, default_value = "beer")]
    preset: String,

    /// Run invariant checks after the main run
    #[arg(short, long)]
    validate: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== Beer Sloshing Demo ===\n");

    let config = SimulatorConfig::preset(&args.preset).unwrap_or_else(|| {
        println!("Unknown preset '{}', using beer", args.preset);
        SimulatorConfig::default()
    });

    let mut sim = match BeerSimulator::with_config(args.width, args.height, config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("Failed to create simulator: {err}");
            std::process::exit(1);
        }
    };
    println!("{}", sim.describe());
    println!(
        "Preset: {}, damping {:.2}/s, filter {:.3}s, {} substep(s) at max dt\n",
        args.preset,
        config.damping,
        config.filter_time_constant,
        config.substeps_for(config.max_dt)
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let frame = 1.0 / args.fps.max(1.0);
    let base = Acceleration::new(args.tilt_x, args.tilt_y, args.tilt_z);
    let jitter_amount = args.jitter.clamp(0.0, 0.9);

    println!("Time(s) |  Min lvl |  Max lvl | Bottom row |     Volume |  Flow energy | Substeps");
    println!("--------|----------|----------|------------|------------|--------------|---------");

    // Relay loop: the first sample has no predecessor and uses a nominal frame
    let mut clock = 0.0_f32;
    let mut last_sample: Option<f32> = None;
    let mut next_report = 0.0_f32;
    let mut last_acc = base;
    let mut peak_bottom = 0.0_f32;

    while clock < args.duration {
        let jitter = if jitter_amount > 0.0 {
            rng.random_range(-jitter_amount..jitter_amount)
        } else {
            0.0
        };
        clock += frame * (1.0 + jitter);

        let dt = last_sample.map_or(1.0 / 60.0, |previous| clock - previous);
        last_sample = Some(clock);

        let rocking = if args.slosh_period > 0.0 {
            args.slosh * (std::f32::consts::TAU * clock / args.slosh_period).sin()
        } else {
            0.0
        };
        let mut sample = || {
            if args.noise > 0.0 {
                rng.random_range(-args.noise..args.noise)
            } else {
                0.0
            }
        };
        let acc = Acceleration::new(
            base.x + rocking + sample(),
            base.y + sample(),
            base.z + sample(),
        );

        sim.update(acc, dt);
        last_acc = acc;

        // Stand-in for the renderer: every frame reads a snapshot
        let bottom = bottom_row_mean(&sim, acc);
        peak_bottom = peak_bottom.max(bottom);

        if clock >= next_report {
            let stats = sim.stats();
            println!(
                "{:7.2} | {:8.4} | {:8.4} | {:10.4} | {:10.2} | {:12.4} | {:8}",
                clock,
                stats.min_level,
                stats.max_level,
                bottom,
                stats.total_volume,
                stats.flow_energy,
                stats.last_substeps
            );
            next_report += args.report_interval;
        }
    }

    let stats = sim.stats();
    println!("\n=== Simulation Complete ===");
    println!("Updates: {}", stats.step_count);
    println!("Simulated time: {:.2}s", stats.simulated_time);
    println!(
        "Volume drift: {:+.3e}",
        (stats.total_volume - stats.initial_volume) / stats.initial_volume
    );
    println!("Level range: {:.4} .. {:.4}", stats.min_level, stats.max_level);
    println!("Peak bottom-row level: {:.4}", peak_bottom);
    if stats.repaired_cells > 0 {
        println!("Repaired cells: {}", stats.repaired_cells);
    }

    print_row_profile(&sim, last_acc);

    if args.validate {
        run_validation_tests();
    }

    sim.release();
}

/// Mean level of the bottom row of a fresh snapshot
fn bottom_row_mean(sim: &BeerSimulator, acc: Acceleration) -> f32 {
    let state = sim.get_state(acc);
    state.row_mean(state.height - 1).unwrap_or(0.0)
}

/// Print mean level for a handful of rows, top of the glass first
fn print_row_profile(sim: &BeerSimulator, acc: Acceleration) {
    let state = sim.get_state(acc);
    println!(
        "\nRow profile (tilt x {:.1}°, z {:.1}°):",
        state.tilt_x_deg, state.tilt_z_deg
    );

    let rows = state.height.min(10);
    let max_depth = sim.config().max_depth;
    for i in 0..rows {
        let y = if rows > 1 {
            i * (state.height - 1) / (rows - 1)
        } else {
            0
        };
        let mean = state.row_mean(y).unwrap_or(0.0);
        let bar = "#".repeat((mean / max_depth * 40.0).round() as usize);
        println!("  row {:4} | {:6.3} | {}", y, mean, bar);
    }
}

fn run_validation_tests() {
    println!("\n=== Running Validation Tests ===\n");

    // Test 1: Quiescence
    println!("Test 1: Level device stays still");
    let mut sim = BeerSimulator::new(40, 60).unwrap();
    for _ in 0..300 {
        sim.update(Acceleration::LEVEL, 1.0 / 60.0);
    }
    let stats = sim.stats();
    if stats.flow_energy == 0.0 && stats.min_level == stats.max_level {
        println!("  ✓ PASS: No motion without tilt");
    } else {
        println!("  ✗ FAIL: Flow energy {:.3e}", stats.flow_energy);
    }

    // Test 2: Upright glass
    println!("\nTest 2: Upright glass settles toward the bottom");
    let mut sim = BeerSimulator::new(10, 10).unwrap();
    for _ in 0..60 {
        sim.update(Acceleration::new(0.0, 1.0, 0.0), 1.0 / 60.0);
    }
    let state = sim.get_state(Acceleration::LEVEL);
    let top: f32 = (0..5).filter_map(|y| state.row_mean(y)).sum::<f32>() / 5.0;
    let bottom: f32 = (5..10).filter_map(|y| state.row_mean(y)).sum::<f32>() / 5.0;
    println!("  Top half mean: {:.4}", top);
    println!("  Bottom half mean: {:.4}", bottom);
    if bottom > top {
        println!("  ✓ PASS: Liquid pooled at the bottom");
    } else {
        println!("  ✗ FAIL: Expected bottom half to be fuller");
    }

    // Test 3: Containment under extreme input
    println!("\nTest 3: Extreme shaking stays contained");
    let mut sim = BeerSimulator::new(32, 32).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2000 {
        let acc = Acceleration::new(
            rng.random_range(-100.0..100.0),
            rng.random_range(-100.0..100.0),
            rng.random_range(-100.0..100.0),
        );
        sim.update(acc, rng.random_range(0.0..0.2));
    }
    let stats = sim.stats();
    let drift = (stats.total_volume - stats.initial_volume).abs() / stats.initial_volume;
    println!("  Level range: {:.4} .. {:.4}", stats.min_level, stats.max_level);
    println!("  Volume drift: {:.3e}", drift);
    if stats.min_level >= 0.0 && stats.max_level <= sim.config().max_depth && drift < 1e-4 {
        println!("  ✓ PASS: Levels bounded and volume conserved");
    } else {
        println!("  ✗ FAIL: Invariants violated");
    }

    println!("\n=== Validation Complete ===");
}
