use clap::Parser;

use rust_tdvp::{read_config, NullRecorder, Recorder, TdvpResult, WaveFunctionModel, YamlRecorder};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,
}

fn run(args: &Args) -> TdvpResult<()> {
    let config = read_config(&args.config)?;
    let mut evolution = config.build()?;
    let mut recorder: Box<dyn Recorder> = match &config.output {
        Some(path) => Box::new(YamlRecorder::create(path)?),
        None => Box::new(NullRecorder),
    };

    let steps = evolution.run(config.t_max, recorder.as_mut())?;

    let trajectory = evolution.trajectory();
    println!("TDVP Run Summary");
    println!("----------------------------------------");
    println!("Sites: {}", evolution.model().n_sites());
    println!("Parameters: {}", evolution.model().num_params());
    println!("Accepted steps: {}", steps);
    println!("Final time: {:.6}", evolution.t());
    if let (Some(first), Some(last)) = (trajectory.first(), trajectory.last()) {
        println!("Initial energy: {:.6} ± {:.6}", first.energy.mean.re, first.energy.error);
        println!("Final energy: {:.6} ± {:.6}", last.energy.mean.re, last.energy.error);
        for (name, stats) in last.observables.iter() {
            println!("{}: {:.6} ± {:.6}", name, stats.mean.re, stats.error);
        }
        let rejections: usize = trajectory.iter().map(|r| r.rejections).sum();
        println!("Rejected attempts: {}", rejections);
    }
    if let Some(path) = &config.output {
        println!("Trajectory written to {}", path);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
