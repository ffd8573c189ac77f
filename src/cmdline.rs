//! Command line parsing for hlsfuzz.
use argh::FromArgs;
use hlsfuzz_gen::OpDistribution;
use hlsfuzz_utils::{Error, FuzzResult, OutputFile};
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
#[argh(help_triggers("-h", "--help"))]
/// Generate a random HLS C++ program and two copies of it that differ only
/// in their loop pragmas.
pub struct Opts {
    /// seed of the generated program
    #[argh(option, short = 's', default = "42")]
    pub seed: u64,

    /// number of random actions used to build the program
    #[argh(option, short = 'n', default = "100")]
    pub actions: usize,

    /// name of the top-level function
    #[argh(option, long = "top", default = "String::from(\"top\")")]
    pub top: String,

    /// op kind distribution: default, arithmetic, logical, comparison or
    /// uniform
    #[argh(option, long = "ops", default = "OpDistribution::Default")]
    pub ops: OpDistribution,

    /// directory that receives benchmark_1.cpp and benchmark_2.cpp
    #[argh(
        option,
        short = 'o',
        long = "output-dir",
        default = "PathBuf::from(\".\")"
    )]
    pub output_dir: PathBuf,

    /// emit only the program without pragma injection to this file
    /// (`-` for stdout)
    #[argh(option, long = "single")]
    pub single: Option<OutputFile>,

    /// where to write the run manifest, default is manifest.json in the
    /// output directory
    #[argh(option, long = "manifest")]
    pub manifest: Option<PathBuf>,

    /// log level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

impl Opts {
    /// Parse the command line and check the options.
    pub fn get_opts() -> FuzzResult<Opts> {
        let opts: Opts = argh::from_env();
        if opts.top.is_empty() {
            return Err(Error::invalid_argument(
                "--top must name a function",
            ));
        }
        if opts.single.is_none() && !opts.output_dir.is_dir() {
            return Err(Error::invalid_argument(format!(
                "output directory `{}` does not exist",
                opts.output_dir.display()
            )));
        }
        Ok(opts)
    }
}
