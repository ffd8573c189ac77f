//! Driver for the hlsfuzz generator.
use crate::cmdline::Opts;
use hlsfuzz_backend::{Backend, HlsCppBackend};
use hlsfuzz_gen::{
    BuilderConfig, DifferentialInjector, RandomGraphBuilder, RandomPragmaPolicy,
};
use hlsfuzz_ir::GraphStats;
use hlsfuzz_utils::{FuzzResult, OutputFile};
use serde::Serialize;
use std::path::PathBuf;

/// Summary of one run, read by the synthesis scripts.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub seed: u64,
    pub top: String,
    pub files: Vec<ManifestEntry>,
    pub stats: GraphStats,
}

#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    /// Target clock period in nanoseconds.
    pub clock_period: u32,
}

/// Run the generator from the command line.
pub fn run_fuzzer() -> FuzzResult<()> {
    let opts = Opts::get_opts()?;

    // enable tracing
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let config = BuilderConfig {
        actions: opts.actions,
        function_name: opts.top.clone(),
        ops: opts.ops,
        ..BuilderConfig::default()
    };
    let graph = RandomGraphBuilder::new(config, opts.seed)?.build()?;

    if let Some(file) = opts.single {
        let backend = HlsCppBackend::with_header(format!("seed {}", opts.seed));
        return backend.run(&graph, file);
    }

    let injector = DifferentialInjector::new(RandomPragmaPolicy::default());
    let (first, second) = injector.inject(&graph, opts.seed)?;
    let mut files = Vec::with_capacity(2);
    for (copy, program) in [(1, &first), (2, &second)] {
        let path = opts.output_dir.join(format!("benchmark_{copy}.cpp"));
        let header = format!(
            "seed {}, copy {copy}\nclock period {}ns",
            opts.seed, program.clock_period
        );
        HlsCppBackend::with_header(header)
            .run(&program.graph, OutputFile::File(path.clone()))?;
        log::info!("Wrote `{}`", path.display());
        files.push(ManifestEntry {
            path,
            clock_period: program.clock_period,
        });
    }

    let manifest = Manifest {
        seed: opts.seed,
        top: opts.top,
        files,
        stats: graph.stats(),
    };
    let path = opts
        .manifest
        .unwrap_or_else(|| opts.output_dir.join("manifest.json"));
    let out = &mut OutputFile::file(path).get_write()?;
    serde_json::to_writer_pretty(out, &manifest)?;
    Ok(())
}
