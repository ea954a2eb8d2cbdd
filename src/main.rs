//! The `wmediumd` daemon binary.

use std::{env, error::Error, io, io::Write, process};

use getopts::Options;
use log::info;
use rand::{rngs::SmallRng, SeedableRng};

use wmediumd::{
    config::Config,
    event::EventLoop,
    hwsim::HwsimSocket,
    medium::Medium,
    model::SnrErrorModel,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage(opts: &Options) {
    let brief = format!(
        "wmediumd v{} - a wireless medium simulator for mac80211_hwsim\n\
         Usage: wmediumd [-h] [-V] [-c FILE] [-o FILE]",
        VERSION
    );
    print!("{}", opts.usage(&brief));
}

fn build_opts() -> Options {
    let mut opts = Options::new();
    opts.optflag("h", "", "print this help and exit");
    opts.optflag("V", "", "print version and exit");
    opts.optopt("c", "", "set input config file", "FILE");
    opts.optopt("o", "", "write a skeleton config file and exit", "FILE");
    opts
}

/// Ask on stdin how many interfaces the skeleton should cover.
fn prompt_interfaces() -> Result<usize, Box<dyn Error>> {
    print!("How many interfaces are active?\n> ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().parse::<usize>()?)
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let opts = build_opts();

    if args.len() == 1 {
        eprintln!("wmediumd: this program needs arguments\n");
        print_usage(&opts);
        return Err("no arguments given".into());
    }

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("wmediumd: {}\n", e);
            print_usage(&opts);
            return Err(e.into());
        }
    };
    if !matches.free.is_empty() {
        print_usage(&opts);
        return Err(format!("unexpected argument '{}'", matches.free[0]).into());
    }

    if matches.opt_present("h") {
        print_usage(&opts);
        return Ok(());
    }
    if matches.opt_present("V") {
        println!(
            "wmediumd v{} - a wireless medium simulator for mac80211_hwsim",
            VERSION
        );
        return Ok(());
    }

    if let Some(path) = matches.opt_str("o") {
        let interfaces = prompt_interfaces()?;
        Config::write_skeleton(&path, interfaces)?;
        println!("skeleton config for {} interfaces written to {}", interfaces, path);
        return Ok(());
    }

    let path = match matches.opt_str("c") {
        Some(path) => path,
        None => {
            print_usage(&opts);
            return Err("a config file is required to run (-c FILE)".into());
        }
    };
    let config = Config::load(&path)?;
    info!("loaded {} stations from {}", config.stations.len(), path);

    let mut medium = Medium::new(SnrErrorModel, SmallRng::from_entropy(), config.snr_db);
    for addr in &config.stations {
        medium.add_station(*addr);
    }
    for link in &config.links {
        medium.set_link_snr(link.from, link.to, link.snr_db);
    }

    let sock = HwsimSocket::connect()?;
    let mut event_loop = EventLoop::new(sock, medium)?;
    event_loop.run()?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("wmediumd: {}", e);
        process::exit(1);
    }
}
