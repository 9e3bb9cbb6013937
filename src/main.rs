use std::process;

use islandga::evolution::{IslandLauncher, IslandOptions, MigrationTopology};
use islandga::instance::{MachineNumbering, ProblemInstance};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut builder = IslandOptions::builder();
    let mut numbering = MachineNumbering::OneBased;
    let mut path: Option<String> = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--islands" => {
                builder = builder.num_islands(value(&args, i));
                i += 2;
            }
            "--population" => {
                builder = builder.total_population_size(value(&args, i));
                i += 2;
            }
            "--generations" => {
                builder = builder.num_generations(value(&args, i));
                i += 2;
            }
            "--topology" => {
                builder = builder.migration_topology(value::<MigrationTopology>(&args, i));
                i += 2;
            }
            "--migration-frequency" => {
                builder = builder.migration_frequency(value(&args, i));
                i += 2;
            }
            "--migration-rate" => {
                builder = builder.migration_rate(value(&args, i));
                i += 2;
            }
            "--seed" => {
                builder = builder.seed(value(&args, i));
                i += 2;
            }
            "--zero-based" => {
                numbering = MachineNumbering::ZeroBased;
                i += 1;
            }
            "--help" | "-h" => usage_and_exit(0),
            flag if flag.starts_with("--") => usage_and_exit(2),
            file => {
                if path.replace(file.to_string()).is_some() {
                    usage_and_exit(2);
                }
                i += 1;
            }
        }
    }

    let path = path.unwrap_or_else(|| usage_and_exit(2));

    let instance = ProblemInstance::from_file(&path, numbering).unwrap_or_else(|e| {
        eprintln!("Cannot load benchmark file {path}");
        fail(e)
    });
    let options = builder.build().unwrap_or_else(|e| fail(e));

    println!("Instance: {} ({} jobs x {} machines)", path, instance.num_jobs(), instance.num_machines());
    println!(
        "Islands: {}, population: {} ({} per island), generations: {}",
        options.get_num_islands(),
        options.get_total_population_size(),
        options.sub_population_size(),
        options.get_num_generations()
    );
    println!(
        "Migration: {} every {} generations, {} individuals",
        options.get_migration_topology(),
        options.get_migration_frequency(),
        options.migration_count()
    );

    let lower_bound = instance.lower_bound();
    let summary = IslandLauncher::new(options, instance)
        .launch()
        .unwrap_or_else(|e| fail(e));

    match summary.best {
        Some(best) => {
            println!("Best makespan: {} (island {})", best.individual.makespan, best.island);
            println!("Lower bound: {}", lower_bound);
            println!("Sequence: {:?}", best.individual.chromosome.genes());
        }
        None => println!("No solution found"),
    }
    println!("Elapsed: {:.3}s", summary.elapsed.as_secs_f64());
}

fn value<T: std::str::FromStr>(args: &[String], i: usize) -> T {
    let raw = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Invalid value '{}' for {}", raw, args[i]);
        usage_and_exit(2)
    })
}

fn fail(e: islandga::GeneticError) -> ! {
    eprintln!("Error: {e}");
    process::exit(1)
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  islandga <benchmark-file> [options]\n\nOptions:\n  --islands N                Number of islands (default: 4)\n  --population N             Total population, divisible by the island count (default: 512)\n  --generations N            Generations per island (default: 200)\n  --topology RING|RANDOM     Migration topology (default: RING)\n  --migration-frequency N    Generations between migrations (default: 25)\n  --migration-rate R         Share of each island that emigrates (default: 0.10)\n  --seed SEED                Base seed, island r uses SEED + r (default: 0)\n  --zero-based               Machine ids in the file start at 0 instead of 1\n\nLog verbosity follows RUST_LOG (default: info).\n"
    );
    process::exit(code)
}
