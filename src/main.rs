#[macro_use]
extern crate clap;

use {
    anyhow::{anyhow, bail, Result},
    clap::ArgMatches,
    log::{error, info},
    ocean_driver::{output::SnapshotReader, parameters::Parameters, stepper::UpwindStepper},
    simplelog::{Config as LogConfig, LevelFilter, TermLogger, TerminalMode},
    std::fs::{create_dir_all, File},
};

#[quit::main]
fn main() {
    let matches = clap_app!(ocean_driver =>
        (version: crate_version!())
        (about: "Builds, runs and inspects ocean simulations.")
        (@arg QUIET: -q --quiet "Only log messages at info level and above.")
        (@subcommand run =>
            (about: "Runs a simulation with the reference upwind stepper.")
            (@arg PARAMETERS: -p --parameters +takes_value +required "Path to file containing simulation parameters.")
        )
        (@subcommand grid =>
            (about: "Builds the grid described by a parameters file and prints a summary.")
            (@arg PARAMETERS: -p --parameters +takes_value +required "Path to file containing simulation parameters.")
        )
        (@subcommand inspect =>
            (about: "Lists the records of a snapshot file and the range of each field.")
            (@arg FILE: +required "Snapshot file to inspect.")
        )
    )
    .get_matches();

    let level = if matches.is_present("QUIET") {
        LevelFilter::Info
    } else {
        LevelFilter::Debug
    };
    TermLogger::init(level, LogConfig::default(), TerminalMode::Mixed)
        .expect("Failed to initialize logger");

    run_subcommand(&matches).unwrap_or_else(|e| {
        error!("Error: \"{}\"", e);
        quit::with_code(1);
    });
}

fn load_parameters(matches: &ArgMatches) -> Result<Parameters> {
    let path = matches
        .value_of("PARAMETERS")
        .ok_or_else(|| anyhow!("Path to parameters file not supplied"))?;

    let file = File::open(path).unwrap_or_else(|e| {
        error!("Failed to open {}: \"{}\"", path, e);
        quit::with_code(1);
    });

    let params = serde_yaml::from_reader::<_, Parameters>(file).unwrap_or_else(|e| {
        error!("Failed to parse parameters from {}: \"{}\"", path, e);
        quit::with_code(1);
    });

    info!(
        "Successfully loaded simulation parameters from \"{}\": \n{:#?}",
        path, params
    );

    Ok(params)
}

fn run_subcommand(matches: &ArgMatches) -> Result<()> {
    let (subcmd, sub_matches) = match matches.subcommand() {
        (name, Some(sub_matches)) => (name, sub_matches),
        _ => bail!("No subcommand selected"),
    };

    info!("Starting {}", subcmd);

    match subcmd {
        "run" => {
            let params = load_parameters(sub_matches)?;
            create_dir_all(&params.environment.output_directory)?;

            let mut sim = params.build_simulation(UpwindStepper::new())?;
            info!("{}", sim.model().grid().summary());

            let summary = sim.run()?;
            info!(
                "{}: {} iterations, t = {}, wall time {:.2?}",
                summary.reason, summary.iterations, summary.final_time, summary.wall_time
            );
        }
        "grid" => {
            let params = load_parameters(sub_matches)?;
            let grid = params.build_grid()?;
            println!("{}", grid.summary());
        }
        "inspect" => {
            let path = sub_matches
                .value_of("FILE")
                .ok_or_else(|| anyhow!("Snapshot file not supplied"))?;
            let reader = SnapshotReader::open(path)?;
            println!("{}: {}", path, reader.summary());
        }
        _ => bail!("Unknown subcommand {}", subcmd),
    }

    info!("Finished {}", subcmd);

    Ok(())
}
